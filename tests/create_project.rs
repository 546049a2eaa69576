#![cfg(unix)]

use std::fs;
use std::path::Path;

use stagehand::commands::create::{self, CreateOptions};
use stagehand::config::Config;
use stagehand::supervisor::Console;
use stagehand::template::TemplateError;

fn write_template(dir: &Path) {
    fs::create_dir_all(dir.join("src/server")).unwrap();
    fs::create_dir_all(dir.join("src/client")).unwrap();
    fs::write(
        dir.join("package.template.json"),
        "{ \"name\": \"${name}\", \"scripts\": { \"dev\": \"stagehand dev\" } }\n",
    )
    .unwrap();
    fs::write(
        dir.join("src/server/index.template.ts"),
        "console.log(`${name} listening on \\${port}`);\n",
    )
    .unwrap();
    fs::write(dir.join("src/client/style.css"), "body { margin: 0 }\n").unwrap();
    fs::write(dir.join("tsconfig.json"), "{ \"files\": [\"$schema\"] }\n").unwrap();
}

fn options(name: &str, template: &Path) -> CreateOptions {
    CreateOptions {
        name: name.to_string(),
        template: Some(template.to_path_buf()),
        skip_install: true,
        skip_git: true,
        link: None,
    }
}

#[tokio::test]
async fn create_copies_and_expands_template() {
    let template = tempfile::tempdir().unwrap();
    let base = tempfile::tempdir().unwrap();
    write_template(template.path());

    let target = create::run(
        base.path(),
        &options("my-app", template.path()),
        &Config::default(),
        Console::capture(),
    )
    .await
    .unwrap();

    assert_eq!(target, base.path().join("my-app"));
    assert_eq!(
        fs::read_to_string(target.join("package.json")).unwrap(),
        "{ \"name\": \"my-app\", \"scripts\": { \"dev\": \"stagehand dev\" } }\n"
    );
    assert_eq!(
        fs::read_to_string(target.join("src/server/index.ts")).unwrap(),
        "console.log(`my-app listening on ${port}`);\n"
    );
    assert!(!target.join("package.template.json").exists());
    assert!(!target.join("src/server/index.template.ts").exists());

    // Non-template files are copied verbatim, `$` included.
    assert_eq!(
        fs::read_to_string(target.join("tsconfig.json")).unwrap(),
        "{ \"files\": [\"$schema\"] }\n"
    );
    assert!(target.join("src/client/style.css").exists());
}

#[tokio::test]
async fn unknown_variable_names_the_file() {
    let template = tempfile::tempdir().unwrap();
    let base = tempfile::tempdir().unwrap();
    fs::write(template.path().join("README.template.md"), "# ${title}\n").unwrap();

    let err = create::run(
        base.path(),
        &options("docs", template.path()),
        &Config::default(),
        Console::capture(),
    )
    .await
    .unwrap_err();

    match err.downcast_ref::<TemplateError>() {
        Some(TemplateError::UnknownVariableIn { path, name }) => {
            assert_eq!(name, "title");
            assert!(path.ends_with("README.template.md"));
        }
        other => panic!("expected unknown variable, got {:?}", other),
    }
}

#[tokio::test]
async fn existing_target_is_rejected() {
    let template = tempfile::tempdir().unwrap();
    let base = tempfile::tempdir().unwrap();
    write_template(template.path());
    fs::create_dir(base.path().join("taken")).unwrap();
    fs::write(base.path().join("taken/keep.txt"), "mine").unwrap();

    let err = create::run(
        base.path(),
        &options("taken", template.path()),
        &Config::default(),
        Console::capture(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<TemplateError>(),
        Some(TemplateError::AlreadyExists(_))
    ));
    assert_eq!(
        fs::read_to_string(base.path().join("taken/keep.txt")).unwrap(),
        "mine"
    );
    assert!(!base.path().join("taken/package.json").exists());
}

#[tokio::test]
async fn missing_template_dir_is_an_error() {
    let base = tempfile::tempdir().unwrap();
    let err = create::run(
        base.path(),
        &options("app", &base.path().join("no-template")),
        &Config::default(),
        Console::capture(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<TemplateError>(),
        Some(TemplateError::TemplateNotFound(_))
    ));
}

#[tokio::test]
async fn install_and_git_steps_run_in_the_new_project() {
    let template = tempfile::tempdir().unwrap();
    let base = tempfile::tempdir().unwrap();
    write_template(template.path());

    let mut config = Config::default();
    config.toolchain.npm = "true".to_string();
    config.toolchain.git = "true".to_string();
    let opts = CreateOptions {
        skip_install: false,
        skip_git: false,
        link: Some("stagehand".to_string()),
        ..options("web", template.path())
    };

    let console = Console::capture();
    create::run(base.path(), &opts, &config, console.clone())
        .await
        .unwrap();

    let stderr = console.captured_stderr();
    assert!(stderr.contains("\x1b[36m[npm]\x1b[0m exited with code 0."));
    assert!(stderr.contains("\x1b[33m[git]\x1b[0m exited with code 0."));
}

#[tokio::test]
async fn failing_step_is_an_error() {
    let template = tempfile::tempdir().unwrap();
    let base = tempfile::tempdir().unwrap();
    write_template(template.path());

    let mut config = Config::default();
    config.toolchain.git = "false".to_string();
    let opts = CreateOptions {
        skip_git: false,
        ..options("broken", template.path())
    };

    let err = create::run(base.path(), &opts, &config, Console::capture())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "`false init` exited with code 1");
    assert!(base.path().join("broken/package.json").exists());
}
