//! # VU Rewriting
//!
//! Walks a [`Document`] depth first, sends every codified statement found in a
//! VU sidebar to the validator, and applies the verdict in place:
//!
//! - **Passed**: the item text becomes the formatted text, identifier tag restored
//! - **Eliminated**: the item is removed from its list
//! - **Failed**: the item keeps its original text and the run is marked failed
//!
//! Statement failures never stop the walk, so one run reports all of them.
//! Channel errors do: the validator's state can no longer be trusted.

pub mod report;

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::build::{AttributeClassifier, BuildConfiguration};
use crate::codified::is_codified;
use crate::document::{AttributeTracker, Document, Node, NodeKind};
use crate::preprocess::{WORKAROUND_SENTINEL, strip_workaround};
use crate::validator::{ChannelError, FormatRequest, ValidationService, Verdict};

pub use report::{RunReport, StatementFailure};

#[derive(Debug, thiserror::Error)]
pub enum VuError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("validator rejected the build configuration")]
    ConfigurationRejected { diagnostics: Vec<String> },
}

/// Validates and rewrites every codified VU in `document`.
///
/// The validator is configured once before the walk and terminated exactly
/// once afterwards, including when the walk fails.
pub fn process_document<S: ValidationService + ?Sized>(
    document: &mut Document,
    service: &mut S,
    classifier: &AttributeClassifier,
) -> Result<RunReport, VuError> {
    let build = BuildConfiguration::resolve(&document.attributes, classifier);
    log::info!(
        "Building with {} versions and {} extensions",
        build.versions.len(),
        build.extensions.len()
    );

    let session = Session::new(service);
    let handshake = session
        .service
        .configure(&build.versions, &build.extensions)?;
    for line in &handshake.diagnostics {
        log::warn!("{line}");
    }
    if !handshake.accepted {
        log::error!("Validator rejected the build configuration");
        return Err(VuError::ConfigurationRejected {
            diagnostics: handshake.diagnostics,
        });
    }

    let mut rewriter = VuRewriter {
        service: &mut *session.service,
        tracker: AttributeTracker::new(document.attributes.clone()),
        baseline: build.baseline,
        api: String::new(),
        report: RunReport::default(),
    };
    for block in &mut document.blocks {
        rewriter.visit(block)?;
    }
    let report = rewriter.report;

    session.close()?;

    log::info!(
        "Codified VUs: {} passed, {} eliminated, {} failed ({} legacy VUs untouched)",
        report.passed,
        report.eliminated,
        report.failures.len(),
        report.legacy
    );
    Ok(report)
}

/// Terminates the validator when dropped unless closed explicitly.
struct Session<'s, S: ValidationService + ?Sized> {
    service: &'s mut S,
    open: bool,
}

impl<'s, S: ValidationService + ?Sized> Session<'s, S> {
    fn new(service: &'s mut S) -> Self {
        Self {
            service,
            open: true,
        }
    }

    fn close(mut self) -> Result<(), ChannelError> {
        self.open = false;
        self.service.terminate()
    }
}

impl<S: ValidationService + ?Sized> Drop for Session<'_, S> {
    fn drop(&mut self) {
        if self.open
            && let Err(e) = self.service.terminate()
        {
            log::warn!("Failed to terminate validator: {e}");
        }
    }
}

struct VuRewriter<'s, S: ValidationService + ?Sized> {
    service: &'s mut S,
    tracker: AttributeTracker,
    baseline: HashSet<String>,
    /// Api of the most recent refpage in document order.
    api: String,
    report: RunReport,
}

impl<S: ValidationService + ?Sized> VuRewriter<'_, S> {
    fn visit(&mut self, node: &mut Node) -> Result<(), VuError> {
        self.tracker.playback(&node.attribute_entries);

        // Last refpage seen wins until the next one
        if let Some(refpage) = node.refpage_api() {
            self.api = refpage.to_string();
        }

        if node.is_vu_section() {
            return self.rewrite_section(node);
        }

        for child in &mut node.children {
            self.visit(child)?;
        }
        Ok(())
    }

    fn rewrite_section(&mut self, section: &mut Node) -> Result<(), VuError> {
        for child in &mut section.children {
            if child.kind == NodeKind::List {
                self.rewrite_list(child)?;
            } else {
                self.visit(child)?;
            }
        }
        Ok(())
    }

    fn rewrite_list(&mut self, list: &mut Node) -> Result<(), VuError> {
        self.tracker.playback(&list.attribute_entries);

        let mut keep = Vec::with_capacity(list.children.len());
        for item in &mut list.children {
            self.tracker.playback(&item.attribute_entries);
            keep.push(self.rewrite_item(item)?);
            for child in &mut item.children {
                self.visit(child)?;
            }
        }

        let mut keep = keep.into_iter();
        list.children.retain(|_| keep.next().unwrap_or(true));
        Ok(())
    }

    /// Returns whether the item stays in its list.
    fn rewrite_item(&mut self, item: &mut Node) -> Result<bool, VuError> {
        if item.kind != NodeKind::ListItem {
            return Ok(true);
        }
        let Some(raw) = item.text.as_deref() else {
            return Ok(true);
        };

        let (vuid, text) = split_vuid(raw);
        let text = if text.starts_with(WORKAROUND_SENTINEL) {
            strip_workaround(&text)
        } else {
            text
        };

        if !is_codified(&text) {
            self.report.legacy += 1;
            return Ok(true);
        }

        let request = FormatRequest {
            api: self.api.clone(),
            location: item.source.clone(),
            attributes: self.tracker.snapshot_minus(&self.baseline),
            text,
        };
        self.report.codified += 1;
        let response = self.service.format(&request)?;
        // A failure reports its diagnostics with the offending statement
        if !matches!(response.verdict, Verdict::Failed) {
            for line in &response.diagnostics {
                log::warn!("{line}");
            }
        }

        match response.verdict {
            Verdict::Passed { lines } => {
                self.report.passed += 1;
                item.text = Some(stitch(vuid.as_deref(), &lines));
                Ok(true)
            }
            Verdict::Eliminated => {
                log::debug!("Eliminated VU {}", vuid.as_deref().unwrap_or(&request.text));
                self.report.eliminated += 1;
                Ok(false)
            }
            Verdict::Failed => {
                let failure = StatementFailure {
                    api: request.api,
                    location: request.location,
                    attributes: request.attributes,
                    text: request.text,
                    diagnostics: response.diagnostics,
                };
                log::error!("{failure}");
                self.report.failures.push(failure);
                Ok(true)
            }
        }
    }
}

/// Splits a leading `[[VUID-...]]` tag off an item's text.
///
/// With a tag, the remaining text is trimmed; without one the text is
/// returned as is.
fn split_vuid(raw: &str) -> (Option<String>, String) {
    static VUID_REGEX: OnceLock<Regex> = OnceLock::new();
    let vuid_regex = VUID_REGEX.get_or_init(|| {
        Regex::new(r"(?s)^\s*\[\[(VUID-[^\]]+)\]\](.*)$").expect("Invalid VUID regex")
    });

    match vuid_regex.captures(raw) {
        Some(caps) => (Some(caps[1].to_string()), caps[2].trim().to_string()),
        None => (None, raw.to_string()),
    }
}

/// Joins formatted lines, restores the tag, and escapes angle brackets so
/// the renderer does not read them as markup.
fn stitch(vuid: Option<&str>, lines: &[String]) -> String {
    let body = lines.join("\n");
    let text = match vuid {
        Some(vuid) => format!("[[{vuid}]]{body}"),
        None => body,
    };
    escape_angle_brackets(&text)
}

fn escape_angle_brackets(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AttributeEntry, AttributeSet};
    use crate::validator::{FakeValidator, FormatResponse};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(
        "[[VUID-vkFoo-bar-00001]]\ncodified-vu x\n",
        Some("VUID-vkFoo-bar-00001"),
        "codified-vu x"
    )]
    #[case("  [[VUID-a-b-1]] text", Some("VUID-a-b-1"), "text")]
    #[case("codified-vu x", None, "codified-vu x")]
    #[case("see [[VUID-a-b-1]] later", None, "see [[VUID-a-b-1]] later")]
    #[case("[[other-anchor]] text", None, "[[other-anchor]] text")]
    fn vuid_splitting(#[case] raw: &str, #[case] vuid: Option<&str>, #[case] text: &str) {
        let (got_vuid, got_text) = split_vuid(raw);
        assert_eq!(got_vuid.as_deref(), vuid);
        assert_eq!(got_text, text);
    }

    #[test]
    fn stitching_escapes_brackets() {
        let lines = vec!["a < b".to_string(), "  c -> d".to_string()];
        assert_eq!(stitch(Some("VUID-x-y-1"), &lines), "[[VUID-x-y-1]]a &lt; b\n  c -&gt; d");
        assert_eq!(stitch(None, &lines), "a &lt; b\n  c -&gt; d");
    }

    fn run(doc: &mut Document, fake: &mut FakeValidator) -> Result<RunReport, VuError> {
        process_document(doc, fake, &AttributeClassifier::default())
    }

    fn vu_document(items: Vec<Node>) -> Document {
        Document::new(
            [("vk_version_1_0", ""), ("vk_khr_surface", ""), ("doctitle", "Spec")]
                .into_iter()
                .collect(),
            vec![Node::refpage("vkCreateFoo").with_child(
                Node::sidebar("Valid Usage").with_child(Node::list().with_children(items)),
            )],
        )
    }

    #[test]
    fn workaround_sentinel_is_stripped_before_sending() {
        let mut doc = vu_document(vec![Node::item(
            "WORKAROUNDcodified-vu\nWORKAROUND  require(a)",
        )]);
        let mut fake = FakeValidator::echo();
        let report = run(&mut doc, &mut fake).unwrap();

        assert_eq!(fake.requests()[0].text, "codified-vu\n  require(a)");
        assert_eq!(doc.item_texts(), vec!["codified-vu\n  require(a)"]);
        assert_eq!(report.passed, 1);
    }

    #[test]
    fn sends_api_and_post_header_attributes() {
        let list = Node::list()
            .with_entry(AttributeEntry::set("VK_KHR_maintenance1", ""))
            .with_child(Node::item("codified-vu x").with_source("chapters/foo.adoc", 3));
        let mut doc = Document::new(
            [("vk_version_1_0", "")].into_iter().collect(),
            vec![
                Node::container(crate::document::Context::Other)
                    .with_entry(AttributeEntry::set("vk_version_1_0", "redefined"))
                    .with_entry(AttributeEntry::set("level", "1")),
                Node::refpage("vkCmdDraw")
                    .with_child(Node::sidebar("Valid Usage (Implicit)").with_child(list)),
            ],
        );
        let mut fake = FakeValidator::echo();
        run(&mut doc, &mut fake).unwrap();

        let request = &fake.requests()[0];
        assert_eq!(request.api, "vkCmdDraw");
        assert_eq!(request.location.as_ref().map(|l| l.line), Some(3));
        let expected: AttributeSet = [("level", "1"), ("VK_KHR_maintenance1", "")]
            .into_iter()
            .collect();
        assert_eq!(request.attributes, expected);
        assert_eq!(
            fake.configured(),
            Some((&["vk_version_1_0".to_string()][..], &[][..]))
        );
    }

    #[test]
    fn latest_refpage_applies_to_later_siblings() {
        let section = || {
            Node::sidebar("Valid Usage")
                .with_child(Node::list().with_child(Node::item("codified-vu x")))
        };
        let mut doc = Document::new(
            AttributeSet::new(),
            vec![
                section(),
                Node::refpage("vkFirst").with_child(section()),
                section(),
                Node::refpage("vkSecond").with_child(
                    Node::container(crate::document::Context::Other).with_child(section()),
                ),
                section(),
            ],
        );
        let mut fake = FakeValidator::echo();
        run(&mut doc, &mut fake).unwrap();

        let apis: Vec<_> = fake.requests().iter().map(|r| r.api.as_str()).collect();
        assert_eq!(apis, vec!["", "vkFirst", "vkFirst", "vkSecond", "vkSecond"]);
    }

    #[test]
    fn lists_outside_vu_sections_are_ignored() {
        let mut doc = Document::new(
            AttributeSet::new(),
            vec![
                Node::sidebar("Notes")
                    .with_child(Node::list().with_child(Node::item("codified-vu x"))),
                Node::list().with_child(Node::item("codified-vu y")),
            ],
        );
        let before = doc.clone();
        let mut fake = FakeValidator::echo();
        let report = run(&mut doc, &mut fake).unwrap();

        assert!(fake.requests().is_empty());
        assert_eq!(doc, before);
        assert_eq!(report, RunReport::default());
    }

    #[test]
    fn channel_error_still_terminates() {
        let mut doc = vu_document(vec![Node::item("codified-vu a"), Node::item("codified-vu b")]);
        let mut fake = FakeValidator::scripted([FormatResponse::passed(["a"])]);
        let err = run(&mut doc, &mut fake).unwrap_err();

        assert!(matches!(err, VuError::Channel(ChannelError::UnexpectedEof { .. })));
        assert_eq!(fake.terminate_calls(), 1);
        assert_eq!(doc.item_texts().len(), 2);
    }

    #[test]
    fn rejected_configuration_processes_nothing() {
        let mut doc = vu_document(vec![Node::item("codified-vu a")]);
        let mut fake = FakeValidator::echo().rejecting_configuration(["unknown version"]);
        let err = run(&mut doc, &mut fake).unwrap_err();

        match err {
            VuError::ConfigurationRejected { diagnostics } => {
                assert_eq!(diagnostics, vec!["unknown version"])
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(fake.requests().is_empty());
        assert_eq!(fake.terminate_calls(), 1);
    }

    #[test]
    fn failures_do_not_stop_the_walk() {
        let mut doc = vu_document(vec![
            Node::item("codified-vu bad"),
            Node::item("legacy prose"),
            Node::item("codified-vu gone"),
            Node::item("codified-vu good"),
        ]);
        let mut fake = FakeValidator::scripted([
            FormatResponse::failed(["type error"]),
            FormatResponse::eliminated(),
            FormatResponse::passed(["good!"]),
        ]);
        let report = run(&mut doc, &mut fake).unwrap();

        assert_eq!(doc.item_texts(), vec!["codified-vu bad", "legacy prose", "good!"]);
        assert_eq!(report.codified, 3);
        assert_eq!(report.legacy, 1);
        assert_eq!(report.eliminated, 1);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(fake.terminate_calls(), 1);
    }
}
