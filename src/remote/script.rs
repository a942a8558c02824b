// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Runner program rendering.
//!
//! Assemble the Ruby programs that the remote runner executes. Every value
//! that originates from content or user input arrives here already encoded,
//! so rendering is nothing more than placing encoded pieces into a fixed
//! template.
//!
//! # Upsert Program Layout
//!
//! ```text
//! page = Page.find_or_initialize_by(title: <title literal>)
//! page.body = <heredoc opener or string literal>
//! <heredoc block, if any>
//! page.published_at ||= Time.zone.parse(<date literal>)
//! page.save!
//! puts "pagesync: #{page.title} -> #{page.slug}"
//! ```
//!
//! The `||=` assignment is what keeps an existing publish date untouched.

use crate::{
    encode::{ContentEncoder, EncodedUpsert, Payload},
    remote::{RemoteProgram, Result},
    teaser::TeaserInstruction,
};

/// Prefix of lines the runner prints on success.
pub const REPORT_PREFIX: &str = "pagesync:";

/// Render find-or-create program for encoded upsert.
///
/// The `label` only shows up in logs.
pub fn render_upsert(label: impl Into<String>, upsert: &EncodedUpsert) -> RemoteProgram {
    let mut source = format!(
        "page = Page.find_or_initialize_by(title: {})\n",
        upsert.match_key
    );

    match &upsert.body {
        Payload::Heredoc { opener, block } => {
            source.push_str(&format!("page.body = {opener}\n"));
            source.push_str(block);
        }
        Payload::Literal(literal) => source.push_str(&format!("page.body = {literal}\n")),
    }

    source.push_str(&format!(
        "page.published_at ||= Time.zone.parse({})\n",
        upsert.published_at
    ));
    source.push_str("page.save!\n");
    source.push_str(&format!(
        "puts \"{REPORT_PREFIX} #{{page.title}} -> #{{page.slug}}\"\n"
    ));

    RemoteProgram {
        label: label.into(),
        source,
    }
}

/// Render page duplication program for teaser.
///
/// # Errors
///
/// - Return [`RemoteError::Encode`](crate::remote::RemoteError::Encode) if
///   slug cannot be encoded.
pub fn render_teaser(encoder: &ContentEncoder, teaser: &TeaserInstruction) -> Result<RemoteProgram> {
    let slug = encoder.inline(teaser.slug())?;
    let source = format!(
        concat!(
            "page = Page.find_by!(slug: {slug})\n",
            "teaser = page.dup\n",
            "teaser.title = \"(Preview) \" + page.title\n",
            "teaser.body = page.body.split[0, {words}].join(\" \") + \"...\"\n",
            "teaser.public = true\n",
            "teaser.save!\n",
            "puts \"{prefix} teaser -> #{{teaser.slug}}\"\n",
        ),
        slug = slug,
        words = teaser.words(),
        prefix = REPORT_PREFIX,
    );

    Ok(RemoteProgram {
        label: format!("teaser of {}", teaser.slug()),
        source,
    })
}
