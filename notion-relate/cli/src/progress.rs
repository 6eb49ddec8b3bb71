//! Terminal rendering of link progress.
//!
//! Compact mode prints one marker per record on a single line:
//! `#` linked, `>` skipped, `_` no match. Verbose mode prints a sentence
//! per record instead.

use std::io::Write;

use notion_relate_lib::{LinkEvent, LinkObserver, LinkReport};

/// Writes progress for each [`LinkEvent`] to `out`.
pub struct ProgressPrinter<W: Write> {
    out: W,
    verbose: bool,
    link_property: String,
}

impl<W: Write> ProgressPrinter<W> {
    pub fn new(out: W, verbose: bool, link_property: impl Into<String>) -> Self {
        Self {
            out,
            verbose,
            link_property: link_property.into(),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn line(&self, event: &LinkEvent) -> String {
        let link = &self.link_property;
        match event {
            LinkEvent::Linked {
                record_id,
                targets,
                dry_run,
            } => format!(
                "{}Linking Base Record ID {} with Auxiliary Record IDs [{}] in {}",
                if *dry_run { "Dry run: " } else { "" },
                record_id,
                targets.join(", "),
                link
            ),
            LinkEvent::Skipped { record_id, .. } => format!(
                "Skipping Base Record ID {record_id} as it already has a relation in {link}."
            ),
            LinkEvent::Unmatched {
                record_id,
                value: Some(value),
            } => format!(
                "No matching records found in auxiliary database for Base Record ID {record_id} with value {value}."
            ),
            LinkEvent::Unmatched {
                record_id,
                value: None,
            } => format!("No match value found for Base Record ID {record_id}."),
            LinkEvent::Failed { record_id, error } => format!(
                "Error processing match property for Base Record ID {record_id}: {error}"
            ),
        }
    }

    fn marker(event: &LinkEvent) -> Option<char> {
        match event {
            LinkEvent::Linked { .. } => Some('#'),
            LinkEvent::Skipped { .. } => Some('>'),
            LinkEvent::Unmatched { .. } => Some('_'),
            // already reported on stderr through tracing
            LinkEvent::Failed { .. } => None,
        }
    }
}

impl<W: Write> LinkObserver for ProgressPrinter<W> {
    fn on_event(&mut self, event: &LinkEvent) {
        // best effort: a closed stdout must not abort linking
        if self.verbose {
            let line = self.line(event);
            let _ = writeln!(self.out, "{line}");
        } else if let Some(marker) = Self::marker(event) {
            let _ = write!(self.out, "{marker}");
            let _ = self.out.flush();
        }
    }

    fn on_finish(&mut self, _report: &LinkReport) {
        if !self.verbose {
            let _ = writeln!(self.out);
        }
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked(dry_run: bool) -> LinkEvent {
        LinkEvent::Linked {
            record_id: "b1".to_string(),
            targets: vec!["x2".to_string(), "x3".to_string()],
            dry_run,
        }
    }

    fn skipped() -> LinkEvent {
        LinkEvent::Skipped {
            record_id: "b2".to_string(),
            existing: vec!["old".to_string()],
        }
    }

    fn unmatched(value: Option<&str>) -> LinkEvent {
        LinkEvent::Unmatched {
            record_id: "b3".to_string(),
            value: value.map(str::to_string),
        }
    }

    fn render(verbose: bool, events: &[LinkEvent]) -> String {
        let mut printer = ProgressPrinter::new(Vec::new(), verbose, "Parent");
        for event in events {
            printer.on_event(event);
        }
        printer.on_finish(&LinkReport::default());
        String::from_utf8(printer.into_inner()).unwrap()
    }

    #[test]
    fn compact_mode_prints_markers_on_one_line() {
        let failed = LinkEvent::Failed {
            record_id: "bad".to_string(),
            error: "boom".to_string(),
        };
        let out = render(false, &[linked(false), skipped(), unmatched(Some("C")), failed]);
        assert_eq!(out, "#>_\n");
    }

    #[test]
    fn compact_mode_ends_with_newline_even_without_records() {
        assert_eq!(render(false, &[]), "\n");
    }

    #[test]
    fn verbose_link_line_lists_targets() {
        let out = render(true, &[linked(false)]);
        assert_eq!(
            out,
            "Linking Base Record ID b1 with Auxiliary Record IDs [x2, x3] in Parent\n"
        );
    }

    #[test]
    fn verbose_dry_run_is_prefixed() {
        let out = render(true, &[linked(true)]);
        assert!(out.starts_with("Dry run: Linking Base Record ID b1"));
    }

    #[test]
    fn verbose_skip_and_no_match_lines() {
        let out = render(true, &[skipped(), unmatched(Some("C")), unmatched(None)]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Skipping Base Record ID b2 as it already has a relation in Parent.",
                "No matching records found in auxiliary database for Base Record ID b3 with value C.",
                "No match value found for Base Record ID b3.",
            ]
        );
    }
}
