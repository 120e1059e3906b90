//! # Fragment Renderer
//!
//! Turns resolved sections into the block-markup fragment written into
//! the destination page:
//!
//! 1. start sentinel
//! 2. style block (always emitted)
//! 3. navigation block, one link per section
//! 4. per section: heading anchored by the section slug, then a gallery;
//!    a fixed-height spacer separates consecutive sections
//! 5. end sentinel
//!
//! Rendering is a pure function of its input: identical sections produce
//! byte-identical output, which the merge idempotence relies on.

use std::fmt::Write as _;

use serde_json::json;

use crate::model::{Section, SectionItem};

/// Opens the generated region of a page body.
pub const START_SENTINEL: &str = "<!-- imgsync:start -->";

/// Closes the generated region of a page body.
pub const END_SENTINEL: &str = "<!-- imgsync:end -->";

/// Height of the spacer block between sections.
pub const SPACER_HEIGHT: &str = "48px";

const STYLE: &str = "\
.imgsync-nav ul{display:flex;flex-wrap:wrap;gap:.5rem 1rem;list-style:none;margin:0 0 2rem;padding:0}\n\
.imgsync-nav a{text-decoration:none}\n\
.imgsync-heading{scroll-margin-top:4rem}\n\
.imgsync-gallery img{object-fit:cover}";

/// Anchor slug: lower-cased, each run of non-alphanumeric characters
/// collapsed into a single `-`, leading and trailing `-` trimmed.
///
/// Names with no alphanumeric characters yield `section`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_sep = false;
    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.push(ch);
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("section");
    }
    slug
}

/// Render the full fragment for `sections`, in input order.
pub fn render(sections: &[Section]) -> String {
    let mut blocks = Vec::with_capacity(sections.len() * 3 + 2);
    blocks.push(style_block());
    blocks.push(nav_block(sections));
    for (idx, section) in sections.iter().enumerate() {
        if idx > 0 {
            blocks.push(spacer_block());
        }
        blocks.push(heading_block(section));
        blocks.push(gallery_block(&section.items));
    }

    let mut out = String::new();
    out.push_str(START_SENTINEL);
    out.push('\n');
    out.push_str(&blocks.join("\n\n"));
    out.push('\n');
    out.push_str(END_SENTINEL);
    out
}

fn style_block() -> String {
    format!("<!-- wp:html -->\n<style class=\"imgsync-style\">\n{STYLE}\n</style>\n<!-- /wp:html -->")
}

fn nav_block(sections: &[Section]) -> String {
    let mut out = String::from("<!-- wp:html -->\n<nav class=\"imgsync-nav\"><ul>\n");
    for section in sections {
        let _ = writeln!(
            out,
            "<li><a href=\"#{}\">{}</a></li>",
            slugify(&section.name),
            escape_html(&section.name)
        );
    }
    out.push_str("</ul></nav>\n<!-- /wp:html -->");
    out
}

fn heading_block(section: &Section) -> String {
    let slug = slugify(&section.name);
    format!(
        "<!-- wp:heading {attrs} -->\n<h2 class=\"wp-block-heading imgsync-heading\" id=\"{slug}\">{name}</h2>\n<!-- /wp:heading -->",
        attrs = json!({ "anchor": slug }),
        name = escape_html(&section.name),
    )
}

fn gallery_block(items: &[SectionItem]) -> String {
    let mut out = format!(
        "<!-- wp:gallery {} -->\n<figure class=\"wp-block-gallery has-nested-images columns-default is-cropped imgsync-gallery\">",
        json!({ "linkTo": "none", "className": "imgsync-gallery" })
    );
    for item in items {
        out.push_str(&image_block(item));
    }
    out.push_str("</figure>\n<!-- /wp:gallery -->");
    out
}

fn image_block(item: &SectionItem) -> String {
    let id = &item.identity.id;
    let id_attr = match id.parse::<u64>() {
        Ok(n) => json!(n),
        Err(_) => json!(id),
    };
    format!(
        "<!-- wp:image {attrs} -->\n<figure class=\"wp-block-image size-large\"><img src=\"{src}\" alt=\"{alt}\" class=\"wp-image-{class_id}\"/></figure>\n<!-- /wp:image -->",
        attrs = json!({ "id": id_attr, "sizeSlug": "large", "linkDestination": "none" }),
        src = escape_html(&item.identity.url),
        alt = escape_html(&item.alt_text),
        class_id = slugify(id),
    )
}

fn spacer_block() -> String {
    format!(
        "<!-- wp:spacer {} -->\n<div style=\"height:{SPACER_HEIGHT}\" aria-hidden=\"true\" class=\"wp-block-spacer\"></div>\n<!-- /wp:spacer -->",
        json!({ "height": SPACER_HEIGHT })
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
