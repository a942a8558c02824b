// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

#![cfg(unix)]

use crate::{decode_upsert, ContentFixture};

use anyhow::Result;
use indicatif::ProgressBar;
use indoc::indoc;
use pagesync::{
    batch::Importer,
    remote::{ssh::{SshExecutor, SshSettings}, RemoteExecutor, RemoteProgram},
};
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{
    env::current_dir,
    fs::{read_to_string, set_permissions, write, Permissions},
    os::unix::fs::PermissionsExt,
};

/// Stand-in SSH client that records what it receives.
///
/// Produces plenty of output before it reads its input, so a client that does
/// not pump every stream at once would deadlock on large programs.
const FAKE_SSH: &str = indoc! {r#"
    #!/bin/sh
    printf '%s\n' "$@" > args.txt
    seq 1 20000
    cat > program.rb
    echo "pagesync: fake -> fake"
    echo "warning: deprecated" >&2
    exit "$(cat exit_code 2>/dev/null || echo 0)"
"#};

fn fake_settings() -> Result<SshSettings> {
    let program = current_dir()?.join("fake-ssh");
    write(&program, FAKE_SSH)?;
    set_permissions(&program, Permissions::from_mode(0o755))?;

    Ok(SshSettings {
        host: "books.example.com".into(),
        user: "root".into(),
        app_dir: "/opt/once/current".into(),
        runner: vec!["bin/rails".into(), "runner".into(), "-".into()],
        program: program.to_string_lossy().into_owned(),
        options: vec!["-o".into(), "BatchMode=yes".into()],
        connect_timeout: None,
    })
}

#[sealed_test]
fn program_travels_through_stdin() -> Result<()> {
    let executor = SshExecutor::new(fake_settings()?, ProgressBar::hidden());
    let program = RemoteProgram {
        label: "large".into(),
        source: "# `$(id)` \"$HOME\" \\\n".repeat(100_000),
    };

    let result = executor.execute(&program)?;
    assert!(result.succeeded);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stderr, "warning: deprecated\n");
    assert_eq!(read_to_string("program.rb")?, program.source);

    let args = read_to_string("args.txt")?;
    let expect = indoc! {"
        -o
        BatchMode=yes
        root@books.example.com
        cd '/opt/once/current' && 'bin/rails' 'runner' '-'
    "};
    assert_eq!(args, expect);

    Ok(())
}

#[sealed_test]
fn remote_exit_status_is_reported() -> Result<()> {
    write("exit_code", "3")?;
    let executor = SshExecutor::new(fake_settings()?, ProgressBar::hidden());
    let program = RemoteProgram {
        label: "broken".into(),
        source: "raise 'boom'\n".into(),
    };

    let result = executor.execute(&program)?;
    assert!(!result.succeeded);
    assert_eq!(result.exit_code, 3);
    assert_eq!(result.stderr, "warning: deprecated\n");

    Ok(())
}

#[sealed_test]
fn import_over_ssh_delivers_exact_body() -> Result<()> {
    let fixture = ContentFixture::new("content")?;
    let body = "# Title\r\n\n`$(rm -rf /)` \"x\" \\ 'y' #{z}\n\n";
    fixture.write("12-over-the-wire.md", body)?;
    let executor = SshExecutor::new(fake_settings()?, ProgressBar::hidden());

    let report = Importer::new(fixture.settings()?, executor, ProgressBar::hidden()).run()?;
    assert!(report.is_success());

    let upsert = decode_upsert(&read_to_string("program.rb")?)?;
    assert_eq!(upsert.title, "over the wire");
    assert_eq!(upsert.body, body);
    assert_eq!(upsert.published_at, "2012-01-01");

    Ok(())
}
