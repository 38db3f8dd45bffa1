//! Unit tests for prompt generation

use psbridge::{PromptGenerator, PromptStyle};
use std::path::PathBuf;

fn generator() -> PromptGenerator {
    PromptGenerator::with_home(Some(PathBuf::from("/home/dev")))
}

#[test]
fn test_default_style() {
    let prompt = generator();
    assert_eq!(prompt.generate("/var/log"), "PS /var/log> ");
    assert_eq!(prompt.generate("/home/dev"), "PS ~> ");
    assert_eq!(prompt.generate("/home/dev/src/app"), "PS ~/src/app> ");
}

#[test]
fn test_home_prefix_needs_path_boundary() {
    let prompt = generator();
    assert_eq!(prompt.generate("/home/developer"), "PS /home/developer> ");
}

#[test]
fn test_windows_paths_use_forward_slashes() {
    let prompt = PromptGenerator::with_home(Some(PathBuf::from("C:\\Users\\dev")));
    assert_eq!(prompt.generate("C:\\Users\\dev\\Documents"), "PS ~/Documents> ");
    assert_eq!(prompt.generate("D:\\data"), "PS D:/data> ");
}

#[test]
fn test_remote_style() {
    let mut prompt = generator();
    prompt.set_remote_host("build01");

    assert!(prompt.is_remote_session());
    assert_eq!(prompt.generate("/srv"), "[build01]: PS /srv> ");

    prompt.set_style(PromptStyle::Default);
    assert!(!prompt.is_remote_session());
    assert_eq!(prompt.generate("/srv"), "PS /srv> ");
}

#[test]
fn test_custom_templates() {
    let mut prompt = generator();

    prompt.set_custom_format("{dir} $ ");
    assert_eq!(prompt.style(), PromptStyle::Custom);
    assert_eq!(prompt.generate("/home/dev/projects/psbridge"), "psbridge $ > ");

    prompt.set_custom_format("[{path}]>");
    assert_eq!(prompt.generate("/home/dev/projects"), "[~/projects]>");

    prompt.set_custom_format("");
    assert_eq!(prompt.generate("/tmp"), "PS /tmp> ");
}

#[test]
fn test_ansi_prompt_is_wrapped_in_green() {
    let prompt = generator();
    assert_eq!(prompt.generate_ansi("/tmp"), "\x1b[32mPS /tmp> \x1b[0m");
}

#[test]
fn test_no_home_disables_abbreviation() {
    let prompt = PromptGenerator::with_home(None);
    assert_eq!(prompt.generate("/home/dev"), "PS /home/dev> ");
}
