use grue3::{Interpreter, Memory, ZError, VM};
use log::error;
use std::env;
use std::fs;
use std::process::ExitCode;

fn usage() {
    println!("Usage: grue3 [-showScoreUpdates] <story-file>");
}

fn main() -> ExitCode {
    env_logger::init();

    let mut show_score_updates = false;
    let mut story_path = None;

    for arg in env::args().skip(1) {
        if arg == "-showScoreUpdates" {
            show_score_updates = true;
        } else if story_path.is_none() {
            story_path = Some(arg);
        } else {
            usage();
            return ExitCode::SUCCESS;
        }
    }

    let Some(story_path) = story_path else {
        usage();
        return ExitCode::SUCCESS;
    };

    let bytes = match fs::read(&story_path) {
        Ok(b) => b,
        Err(e) => {
            error!("failed to read story file {story_path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let memory = match Memory::new(bytes.clone()) {
        Ok(m) => m,
        Err(e) => {
            error!("failed to load story file: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut vm = VM::new(memory);
    vm.show_score_updates = show_score_updates;
    let mut interpreter = Interpreter::new(vm, bytes);

    match interpreter.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(ZError::Fatal(msg)) => {
            error!("{msg}");
            ExitCode::FAILURE
        }
        Err(ZError::Io(e)) => {
            error!("I/O error: {e}");
            ExitCode::FAILURE
        }
    }
}
