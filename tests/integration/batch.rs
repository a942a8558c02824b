// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{ContentFixture, FakePage, FakeRunner};

use anyhow::Result;
use indicatif::ProgressBar;
use indoc::indoc;
use pagesync::batch::{BatchError, ImportFailure, Importer};
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;

const CHAPTER_ONE: &str = indoc! {r#"
    # Intro

    Run `echo $HOME` or "quote" it, \escape it, #{interpolate} it.
"#};

#[sealed_test]
fn import_is_idempotent() -> Result<()> {
    let fixture = ContentFixture::new("content")?;
    fixture.write("01-intro.md", CHAPTER_ONE)?;
    fixture.write("02-deep-dive.md", "deep dive body")?;
    fixture.write("epilogue.md", "the end\n\n")?;
    let runner = FakeRunner::default();

    let first = Importer::new(fixture.settings()?, &runner, ProgressBar::hidden()).run()?;
    assert!(first.is_success());
    assert_eq!(first.imported.len(), 3);
    assert_eq!(runner.created.get(), 3);
    let snapshot = runner.pages.borrow().clone();

    let second = Importer::new(fixture.settings()?, &runner, ProgressBar::hidden()).run()?;
    assert!(second.is_success());
    assert_eq!(runner.executed.get(), 6);
    assert_eq!(runner.created.get(), 3);
    assert_eq!(*runner.pages.borrow(), snapshot);

    let expect = FakePage {
        body: CHAPTER_ONE.into(),
        published_at: Some("2001-01-01".into()),
    };
    assert_eq!(runner.page("intro"), Some(expect));
    assert_eq!(
        runner.page("epilogue").map(|page| page.published_at),
        Some(Some("2025-01-01".into()))
    );

    Ok(())
}

#[sealed_test]
fn remote_failure_does_not_stop_batch() -> Result<()> {
    let fixture = ContentFixture::new("content")?;
    for (index, name) in ["alpha", "beta", "gamma", "delta", "epsilon"].iter().enumerate() {
        fixture.write(&format!("{index:02}-{name}.md"), format!("{name} body"))?;
    }
    let runner = FakeRunner::failing_on(["gamma"]);

    let report = Importer::new(fixture.settings()?, &runner, ProgressBar::hidden()).run()?;
    assert!(!report.is_success());
    assert_eq!(report.total(), 5);
    assert_eq!(report.imported.len(), 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].identity, "gamma");
    assert!(matches!(
        &report.failed[0].failure,
        ImportFailure::Remote(result) if result.exit_code == 1 && !result.succeeded
    ));
    assert_eq!(runner.page_count(), 4);
    assert_eq!(runner.page("gamma"), None);

    Ok(())
}

#[sealed_test]
fn existing_publish_date_is_kept() -> Result<()> {
    let fixture = ContentFixture::new("content")?;
    fixture.write("07-deep-dive.md", "first draft")?;
    let runner = FakeRunner::default();
    runner.seed("intro", "old intro", Some("1999-12-31"));
    fixture.write("intro.md", "new intro")?;

    Importer::new(fixture.settings()?, &runner, ProgressBar::hidden()).run()?;
    assert_eq!(
        runner.page("intro"),
        Some(FakePage {
            body: "new intro".into(),
            published_at: Some("1999-12-31".into()),
        })
    );

    // Renumbered file maps onto the same page, with a different date hint.
    fixture.remove("07-deep-dive.md")?;
    fixture.write("09-deep-dive.md", "second draft")?;
    Importer::new(fixture.settings()?, &runner, ProgressBar::hidden()).run()?;

    let expect = FakePage {
        body: "second draft".into(),
        published_at: Some("2007-01-01".into()),
    };
    assert_eq!(runner.page("deep dive"), Some(expect));
    assert_eq!(runner.page_count(), 2);
    assert_eq!(runner.created.get(), 1);

    Ok(())
}

#[sealed_test]
fn identity_collision_last_import_wins() -> Result<()> {
    let fixture = ContentFixture::new("content")?;
    fixture.write("01-intro.md", "from the first file")?;
    fixture.write("02-intro.md", "from the second file")?;
    let runner = FakeRunner::default();

    let report = Importer::new(fixture.settings()?, &runner, ProgressBar::hidden()).run()?;
    assert_eq!(report.imported.len(), 2);
    assert!(report.imported.iter().all(|item| item.identity == "intro"));
    assert_eq!(runner.page_count(), 1);

    // Enumeration order is up to the file system, so ask the report.
    let last = report.imported.last().map(|item| item.path.clone()).unwrap();
    let expect = std::fs::read_to_string(last)?;
    assert_eq!(runner.page("intro").map(|page| page.body), Some(expect));

    Ok(())
}

#[sealed_test]
fn failed_collision_keeps_earlier_page() -> Result<()> {
    let fixture = ContentFixture::new("content")?;
    fixture.write("01-intro.md", "from the good file")?;
    fixture.write("02-intro.md", "broken PAGESYNC_BODY file")?;
    let runner = FakeRunner::default();

    let report = Importer::new(fixture.settings()?, &runner, ProgressBar::hidden()).run()?;
    assert_eq!(report.imported.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].identity, "intro");
    assert_eq!(
        runner.page("intro").map(|page| page.body),
        Some("from the good file".into())
    );

    Ok(())
}

#[sealed_test]
fn delimiter_collision_fails_only_that_file() -> Result<()> {
    let fixture = ContentFixture::new("content")?;
    fixture.write("01-heredoc.md", "before\nPAGESYNC_BODY\nafter\n")?;
    fixture.write("02-fine.md", "fine\n")?;
    let runner = FakeRunner::default();

    let report = Importer::new(fixture.settings()?, &runner, ProgressBar::hidden()).run()?;
    assert_eq!(report.imported.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(report.failed[0].failure, ImportFailure::Encode(_)));
    assert_eq!(runner.executed.get(), 1);
    assert_eq!(runner.page("heredoc"), None);

    Ok(())
}

#[sealed_test]
fn unreadable_file_fails_only_that_file() -> Result<()> {
    let fixture = ContentFixture::new("content")?;
    fixture.write("01-binary.md", b"\xff\xfe\x00\x80")?;
    fixture.write("02-text.md", "text")?;
    let runner = FakeRunner::default();

    let report = Importer::new(fixture.settings()?, &runner, ProgressBar::hidden()).run()?;
    assert_eq!(report.imported.len(), 1);
    assert!(matches!(report.failed[0].failure, ImportFailure::Read(_)));
    assert!(report
        .to_string()
        .contains("01-binary.md: failed to read content file: stream did not contain valid UTF-8"));

    Ok(())
}

#[sealed_test]
fn body_round_trips_byte_for_byte() -> Result<()> {
    let fixture = ContentFixture::new("content")?;
    let bodies = [
        ("01-tricky.md", indoc! {r#"
            ```sh
            echo "$(whoami)" `date` \$PATH
            ```
            <<'MD'
            MD
            RUBY
            __END__
            'single' \\ #$global #{1 + 1}
        "#}),
        ("02-windows.md", "line one\r\nline two\r\n"),
        ("03-no-newline.md", "no trailing newline"),
        ("04-many-newlines.md", "\n\ntrailing\n\n\n"),
        ("05-empty.md", ""),
    ];
    for (filename, body) in bodies {
        fixture.write(filename, body)?;
    }
    let runner = FakeRunner::default();

    let report = Importer::new(fixture.settings()?, &runner, ProgressBar::hidden()).run()?;
    assert!(report.is_success());
    let expect = ["tricky", "windows", "no newline", "many newlines", "empty"];
    for ((_, body), title) in bodies.iter().zip(expect) {
        assert_eq!(runner.page(title).map(|page| page.body), Some(body.to_string()));
    }

    Ok(())
}

#[sealed_test]
fn only_markdown_files_are_imported() -> Result<()> {
    let fixture = ContentFixture::new("content")?;
    fixture.write("01-intro.md", "intro")?;
    fixture.write("notes.txt", "not content")?;
    fixture.write("draft.md.bak", "backup")?;
    std::fs::create_dir("content/folder.md")?;
    let runner = FakeRunner::default();

    let importer = Importer::new(fixture.settings()?, &runner, ProgressBar::hidden());
    let files = importer.content_files()?;
    assert_eq!(files, vec![std::path::PathBuf::from("content/01-intro.md")]);

    let report = importer.run()?;
    assert_eq!(report.total(), 1);
    assert_eq!(runner.page_count(), 1);

    Ok(())
}

#[sealed_test]
fn missing_content_dir_is_fatal() -> Result<()> {
    let fixture = ContentFixture::new("content")?;
    let mut settings = fixture.settings()?;
    settings.content_dir = "missing".into();
    let runner = FakeRunner::default();

    let result = Importer::new(settings, &runner, ProgressBar::hidden()).run();
    assert!(matches!(result, Err(BatchError::ListDir { .. })));
    assert_eq!(runner.executed.get(), 0);

    Ok(())
}
