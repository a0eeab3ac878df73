// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The assembler: the semantic-call surface the script front-end drives, and
// the per-statement orchestration of resolver → transform → router.
//
// Failure policy: a structural error (context underflow) is fatal and
// surfaces as Err; everything else is recorded in the run report — a bad
// statement is abandoned, a bad page is skipped, and the run carries on.

use std::path::{Path, PathBuf};

use bindwerk_core::error::{BindwerkError, Result};
use bindwerk_core::{AssemblyConfig, PageJob, PageModifier, PageRange, Rotation, RunReport};
use bindwerk_document::sink::DocumentSink;
use bindwerk_image::fax::ImageEncoder;
use bindwerk_image::source::{PageSource, SourceOpener};
use tracing::{info, instrument, warn};

use crate::context::{ContextStack, InputContext, OutputContext};
use crate::resolver;
use crate::router::OutputRouter;
use crate::transform;

/// Drives one assembly run.
///
/// The script front-end calls the context mutators and [`input_images`] in
/// script order, then [`finish`] exactly once to close every output document
/// and collect the run report.
///
/// [`input_images`]: Assembler::input_images
/// [`finish`]: Assembler::finish
pub struct Assembler {
    config: AssemblyConfig,
    opener: Box<dyn SourceOpener>,
    encoder: Box<dyn ImageEncoder>,
    inputs: ContextStack<InputContext>,
    outputs: ContextStack<OutputContext>,
    router: OutputRouter,
    source: Option<Box<dyn PageSource>>,
    report: RunReport,
}

impl Assembler {
    pub fn new(
        config: AssemblyConfig,
        opener: Box<dyn SourceOpener>,
        encoder: Box<dyn ImageEncoder>,
        sink: Box<dyn DocumentSink>,
    ) -> Self {
        let max_sink_failures = config.max_sink_failures;
        Self {
            config,
            opener,
            encoder,
            inputs: ContextStack::new(),
            outputs: ContextStack::new(),
            router: OutputRouter::new(sink, max_sink_failures),
            source: None,
            report: RunReport::default(),
        }
    }

    // -- Input-side semantic calls --------------------------------------------

    pub fn push_input_context(&mut self) {
        self.inputs.push();
    }

    pub fn pop_input_context(&mut self) -> Result<()> {
        self.inputs.pop()
    }

    pub fn set_input_file(&mut self, path: impl Into<PathBuf>) {
        self.inputs.top_mut().source_file = Some(path.into());
    }

    pub fn set_rotation(&mut self, degrees: u32) -> Result<()> {
        self.inputs.top_mut().rotation = Rotation::from_degrees(degrees)?;
        Ok(())
    }

    pub fn set_modifier(&mut self, modifier: PageModifier) {
        self.inputs.top_mut().modifier = modifier;
    }

    // -- Output-side semantic calls -------------------------------------------

    pub fn push_output_context(&mut self) {
        self.outputs.push();
    }

    pub fn pop_output_context(&mut self) -> Result<()> {
        self.outputs.pop()
    }

    pub fn set_output_file(&mut self, path: impl Into<PathBuf>) {
        self.outputs.top_mut().target_file = Some(path.into());
    }

    pub fn set_author(&mut self, text: impl Into<String>) {
        self.outputs.top_mut().metadata.author = Some(text.into());
    }

    pub fn set_creator(&mut self, text: impl Into<String>) {
        self.outputs.top_mut().metadata.creator = Some(text.into());
    }

    pub fn set_title(&mut self, text: impl Into<String>) {
        self.outputs.top_mut().metadata.title = Some(text.into());
    }

    pub fn set_subject(&mut self, text: impl Into<String>) {
        self.outputs.top_mut().metadata.subject = Some(text.into());
    }

    pub fn set_keywords(&mut self, text: impl Into<String>) {
        self.outputs.top_mut().metadata.keywords = Some(text.into());
    }

    /// Declare a bookmark for the next page emitted under this context.
    pub fn set_bookmark(&mut self, title: impl Into<String>) {
        let top = self.outputs.top_mut();
        top.bookmark = Some(title.into());
        top.bookmark_pending = true;
    }

    /// Declare the page-numbering format; attached to the next emitted page.
    pub fn set_page_number_format(&mut self, format: impl Into<String>) {
        let top = self.outputs.top_mut();
        let label = top.page_label.get_or_insert_with(Default::default);
        label.format = format.into();
        top.label_pending = true;
    }

    /// Declare the output page numbering for the following images: the range
    /// start becomes the base the next page label counts from. Emits nothing
    /// by itself.
    pub fn output_pages(&mut self, range: PageRange) {
        let top = self.outputs.top_mut();
        let label = top.page_label.get_or_insert_with(Default::default);
        label.base = range.first();
        top.label_pending = true;
    }

    // -- Statement execution --------------------------------------------------

    /// Process one `images(range)` statement under the current contexts.
    ///
    /// Per-page and per-statement failures are recorded in the report and
    /// never unwind past this call.
    #[instrument(skip(self), fields(first = range.first(), last = range.last()))]
    pub fn input_images(&mut self, range: PageRange) {
        let input = self.inputs.top().clone();

        let Some(source_file) = input.source_file else {
            self.statement_error(BindwerkError::MissingInputFile);
            return;
        };
        let Some(target) = self.outputs.top().target_file.clone() else {
            self.statement_error(BindwerkError::MissingOutputFile);
            return;
        };
        if let Err(err) = self.ensure_source(&source_file) {
            self.statement_error(err);
            return;
        }

        let metadata = self.outputs.top().metadata.clone();

        for page in resolver::resolve(range, input.modifier) {
            let job = PageJob {
                source_file: source_file.clone(),
                page_index: page,
                rotation: input.rotation,
            };

            let transformed = {
                let source = self.source.as_mut().expect("source ensured above");
                transform::transform_page(
                    source.as_mut(),
                    self.encoder.as_ref(),
                    &job,
                    self.config.max_page_points,
                )
            };
            let transformed = match transformed {
                Ok(t) => t,
                Err(err) => {
                    self.page_error(page, err);
                    continue;
                }
            };

            // The output document is created lazily, on the first page that
            // actually survives transformation.
            if let Err(err) = self.router.ensure_document(&target, &metadata) {
                self.statement_error(err);
                return;
            }

            let (bookmark, label) = {
                let top = self.outputs.top();
                (
                    if top.bookmark_pending {
                        top.bookmark.clone()
                    } else {
                        None
                    },
                    if top.label_pending {
                        top.page_label.clone()
                    } else {
                        None
                    },
                )
            };

            match self.router.emit_page(
                &transformed.geometry,
                &transformed.encoded,
                bookmark.as_deref(),
                label.as_ref(),
            ) {
                Ok(_) => {
                    self.report.pages_emitted += 1;
                    let top = self.outputs.top_mut();
                    if bookmark.is_some() {
                        top.bookmark_pending = false;
                    }
                    if label.is_some() {
                        top.label_pending = false;
                    }
                }
                Err(err) => self.page_error(page, err),
            }
        }
    }

    /// Close every output document and return the run report. Always closes,
    /// even after a run full of errors, so no partially-written document
    /// handle is leaked.
    pub fn finish(mut self) -> RunReport {
        self.source = None;
        self.report.documents = self.router.document_names();
        for err in self.router.close_all() {
            self.report.errors.push(format!("close: {err}"));
        }
        self.report.mark_finished();
        info!(
            emitted = self.report.pages_emitted,
            skipped = self.report.pages_skipped,
            documents = self.report.documents.len(),
            "assembly run finished"
        );
        self.report
    }

    /// The report accumulated so far.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    // -- Internals ------------------------------------------------------------

    /// Reuse the open source while consecutive statements name the same file;
    /// reopen only on change.
    fn ensure_source(&mut self, path: &Path) -> Result<()> {
        if let Some(source) = &self.source {
            if source.path() == path {
                return Ok(());
            }
        }
        self.source = None;
        self.source = Some(self.opener.open(path)?);
        Ok(())
    }

    fn statement_error(&mut self, err: BindwerkError) {
        warn!(%err, "statement abandoned");
        self.report.statements_failed += 1;
        self.report.errors.push(err.to_string());
    }

    fn page_error(&mut self, page: u32, err: BindwerkError) {
        warn!(page, %err, "page skipped");
        self.report.pages_skipped += 1;
        self.report.errors.push(format!("page {page}: {err}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use bindwerk_core::{DocumentMetadata, PageGeometry, PageLabel, SourcePageInfo};
    use bindwerk_document::sink::SinkDocument;
    use bindwerk_image::Bitmap;
    use bindwerk_image::fax::FaxEncoder;

    // -- Fake collaborators ---------------------------------------------------

    fn bilevel(width_px: u32, height_px: u32, dpi: f32) -> SourcePageInfo {
        SourcePageInfo {
            width_px,
            height_px,
            x_dpi: dpi,
            y_dpi: dpi,
            samples_per_pixel: 1,
            bits_per_sample: 1,
            planar_config: 1,
        }
    }

    struct FakeSource {
        path: PathBuf,
        pages: Vec<SourcePageInfo>,
    }

    impl PageSource for FakeSource {
        fn path(&self) -> &Path {
            &self.path
        }

        fn page_count(&mut self) -> Result<u32> {
            Ok(self.pages.len() as u32)
        }

        fn page_info(&mut self, page: u32) -> Result<SourcePageInfo> {
            Ok(self.pages[(page - 1) as usize])
        }

        fn read_page(&mut self, page: u32) -> Result<Bitmap> {
            let info = self.pages[(page - 1) as usize];
            Ok(Bitmap::new(info.width_px, info.height_px))
        }
    }

    struct FakeOpener {
        files: HashMap<PathBuf, Vec<SourcePageInfo>>,
        opens: Rc<RefCell<u32>>,
    }

    impl SourceOpener for FakeOpener {
        fn open(&self, path: &Path) -> Result<Box<dyn PageSource>> {
            *self.opens.borrow_mut() += 1;
            match self.files.get(path) {
                Some(pages) => Ok(Box::new(FakeSource {
                    path: path.to_path_buf(),
                    pages: pages.clone(),
                })),
                None => Err(BindwerkError::SourceOpen {
                    path: path.display().to_string(),
                    reason: "no such file".into(),
                }),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Open(String),
        Page(String, u32),
        Bookmark(String, u32, String),
        Label(String, u32, String, u32),
        Close(String),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    struct FakeSink {
        log: Log,
        fail_pages: bool,
        attempts: Rc<RefCell<u32>>,
    }

    impl DocumentSink for FakeSink {
        fn open(&self, path: &Path, _metadata: &DocumentMetadata) -> Result<Box<dyn SinkDocument>> {
            let name = path.display().to_string();
            self.log.borrow_mut().push(Event::Open(name.clone()));
            Ok(Box::new(FakeDocument {
                path: path.to_path_buf(),
                name,
                log: self.log.clone(),
                pages: 0,
                fail_pages: self.fail_pages,
                attempts: self.attempts.clone(),
            }))
        }
    }

    struct FakeDocument {
        path: PathBuf,
        name: String,
        log: Log,
        pages: u32,
        fail_pages: bool,
        attempts: Rc<RefCell<u32>>,
    }

    impl SinkDocument for FakeDocument {
        fn path(&self) -> &Path {
            &self.path
        }

        fn page_count(&self) -> u32 {
            self.pages
        }

        fn add_page(&mut self, geometry: &PageGeometry, _image: &[u8]) -> Result<u32> {
            *self.attempts.borrow_mut() += 1;
            if self.fail_pages {
                return Err(BindwerkError::Sink("disk full".into()));
            }
            self.log
                .borrow_mut()
                .push(Event::Page(self.name.clone(), geometry.width_pt));
            let page = self.pages;
            self.pages += 1;
            Ok(page)
        }

        fn add_bookmark(&mut self, page: u32, title: &str) -> Result<()> {
            self.log
                .borrow_mut()
                .push(Event::Bookmark(self.name.clone(), page, title.into()));
            Ok(())
        }

        fn add_page_label(&mut self, page: u32, label: &PageLabel) -> Result<()> {
            self.log.borrow_mut().push(Event::Label(
                self.name.clone(),
                page,
                label.format.clone(),
                label.base,
            ));
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.log.borrow_mut().push(Event::Close(self.name.clone()));
            Ok(())
        }
    }

    struct Fixture {
        log: Log,
        opens: Rc<RefCell<u32>>,
        attempts: Rc<RefCell<u32>>,
    }

    impl Fixture {
        fn assembler(&self, files: &[(&str, Vec<SourcePageInfo>)], fail_pages: bool) -> Assembler {
            let files = files
                .iter()
                .map(|(name, pages)| (PathBuf::from(*name), pages.clone()))
                .collect();
            Assembler::new(
                AssemblyConfig::default(),
                Box::new(FakeOpener {
                    files,
                    opens: self.opens.clone(),
                }),
                Box::new(FaxEncoder),
                Box::new(FakeSink {
                    log: self.log.clone(),
                    fail_pages,
                    attempts: self.attempts.clone(),
                }),
            )
        }
    }

    fn fixture() -> Fixture {
        Fixture {
            log: Rc::new(RefCell::new(Vec::new())),
            opens: Rc::new(RefCell::new(0)),
            attempts: Rc::new(RefCell::new(0)),
        }
    }

    fn letter_pages(count: usize) -> Vec<SourcePageInfo> {
        vec![bilevel(2550, 3300, 300.0); count]
    }

    // -- Tests ----------------------------------------------------------------

    #[test]
    fn four_page_run_end_to_end() {
        let fx = fixture();
        let mut asm = fx.assembler(&[("a.tif", letter_pages(4))], false);

        asm.set_input_file("a.tif");
        asm.set_output_file("out.pdf");
        asm.input_images(PageRange::new(1, 4).unwrap());
        let report = asm.finish();

        assert!(report.is_clean());
        assert_eq!(report.pages_emitted, 4);
        assert_eq!(report.documents, vec!["out.pdf"]);

        let events = fx.log.borrow();
        let pages: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, Event::Page(_, _)))
            .collect();
        assert_eq!(pages.len(), 4);
        assert!(events.contains(&Event::Close("out.pdf".into())));
    }

    #[test]
    fn geometry_follows_each_pages_own_metadata() {
        let fx = fixture();
        // Page 2 has half the pixels at half the resolution; both pages come
        // out letter-sized only if each uses its own metadata.
        let pages = vec![bilevel(2550, 3300, 300.0), bilevel(1275, 1650, 150.0)];
        let mut asm = fx.assembler(&[("mixed.tif", pages)], false);

        asm.set_input_file("mixed.tif");
        asm.set_output_file("out.pdf");
        asm.input_images(PageRange::new(1, 2).unwrap());
        let report = asm.finish();

        assert_eq!(report.pages_emitted, 2);
        let events = fx.log.borrow();
        let widths: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                Event::Page(_, width_pt) => Some(*width_pt),
                _ => None,
            })
            .collect();
        assert_eq!(widths, vec![612, 612]);
    }

    #[test]
    fn same_output_name_appends_across_statements() {
        let fx = fixture();
        let mut asm = fx.assembler(&[("a.tif", letter_pages(4))], false);

        asm.set_input_file("a.tif");
        asm.set_output_file("out.pdf");
        asm.input_images(PageRange::new(1, 1).unwrap());
        asm.set_output_file("other.pdf");
        asm.input_images(PageRange::new(2, 2).unwrap());
        asm.set_output_file("out.pdf");
        asm.input_images(PageRange::new(3, 3).unwrap());
        let report = asm.finish();

        assert_eq!(report.pages_emitted, 3);
        assert_eq!(report.documents, vec!["out.pdf", "other.pdf"]);

        let events = fx.log.borrow();
        let out_pages = events
            .iter()
            .filter(|e| matches!(e, Event::Page(name, _) if name == "out.pdf"))
            .count();
        assert_eq!(out_pages, 2);
        let opens = events.iter().filter(|e| matches!(e, Event::Open(_))).count();
        assert_eq!(opens, 2);
    }

    #[test]
    fn bookmark_attaches_to_first_emitted_page_only() {
        let fx = fixture();
        let mut asm = fx.assembler(&[("a.tif", letter_pages(3))], false);

        asm.set_input_file("a.tif");
        asm.set_output_file("out.pdf");
        asm.set_bookmark("Part I");
        asm.input_images(PageRange::new(1, 3).unwrap());
        let report = asm.finish();

        assert_eq!(report.pages_emitted, 3);
        let events = fx.log.borrow();
        let bookmarks: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::Bookmark(_, page, title) => Some((*page, title.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(bookmarks, vec![(0, "Part I".to_string())]);
    }

    #[test]
    fn redeclaring_the_bookmark_rearms_it() {
        let fx = fixture();
        let mut asm = fx.assembler(&[("a.tif", letter_pages(4))], false);

        asm.set_input_file("a.tif");
        asm.set_output_file("out.pdf");
        asm.set_bookmark("Part I");
        asm.input_images(PageRange::new(1, 2).unwrap());
        asm.set_bookmark("Part II");
        asm.input_images(PageRange::new(3, 4).unwrap());
        asm.finish();

        let events = fx.log.borrow();
        let bookmarks: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::Bookmark(_, page, title) => Some((*page, title.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            bookmarks,
            vec![(0, "Part I".to_string()), (2, "Part II".to_string())]
        );
    }

    #[test]
    fn page_label_uses_output_pages_base() {
        let fx = fixture();
        let mut asm = fx.assembler(&[("a.tif", letter_pages(2))], false);

        asm.set_input_file("a.tif");
        asm.set_output_file("out.pdf");
        asm.set_page_number_format("A-");
        asm.output_pages(PageRange::new(5, 6).unwrap());
        asm.input_images(PageRange::new(1, 2).unwrap());
        asm.finish();

        let events = fx.log.borrow();
        let labels: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::Label(_, page, format, base) => Some((*page, format.clone(), *base)),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec![(0, "A-".to_string(), 5)]);
    }

    #[test]
    fn empty_expansion_opens_no_document() {
        let fx = fixture();
        let mut asm = fx.assembler(&[("a.tif", letter_pages(1))], false);

        asm.set_input_file("a.tif");
        asm.set_output_file("out.pdf");
        asm.set_modifier(PageModifier::Even);
        asm.input_images(PageRange::new(1, 1).unwrap());
        let report = asm.finish();

        assert!(report.is_clean());
        assert_eq!(report.pages_emitted, 0);
        assert!(report.documents.is_empty());
        assert!(fx.log.borrow().is_empty());
    }

    #[test]
    fn modifier_filters_the_expansion() {
        let fx = fixture();
        let mut asm = fx.assembler(&[("a.tif", letter_pages(6))], false);

        asm.set_input_file("a.tif");
        asm.set_output_file("odd.pdf");
        asm.set_modifier(PageModifier::Odd);
        asm.input_images(PageRange::new(1, 6).unwrap());
        let report = asm.finish();

        assert_eq!(report.pages_emitted, 3);
    }

    #[test]
    fn missing_page_is_skipped_and_the_run_continues() {
        let fx = fixture();
        let mut asm = fx.assembler(&[("a.tif", letter_pages(4))], false);

        asm.set_input_file("a.tif");
        asm.set_output_file("out.pdf");
        asm.input_images(PageRange::new(1, 5).unwrap());
        let report = asm.finish();

        assert_eq!(report.pages_emitted, 4);
        assert_eq!(report.pages_skipped, 1);
        assert!(!report.is_clean());
        assert!(report.errors.iter().any(|e| e.contains("page 5")));
    }

    #[test]
    fn unsupported_and_oversized_pages_are_skipped() {
        let fx = fixture();
        let mut gray = bilevel(100, 100, 300.0);
        gray.bits_per_sample = 8;
        let huge = bilevel(13800, 3300, 300.0);
        let pages = vec![bilevel(2550, 3300, 300.0), gray, huge];
        let mut asm = fx.assembler(&[("a.tif", pages)], false);

        asm.set_input_file("a.tif");
        asm.set_output_file("out.pdf");
        asm.input_images(PageRange::new(1, 3).unwrap());
        let report = asm.finish();

        assert_eq!(report.pages_emitted, 1);
        assert_eq!(report.pages_skipped, 2);
    }

    #[test]
    fn missing_files_abandon_the_statement() {
        let fx = fixture();
        let mut asm = fx.assembler(&[("a.tif", letter_pages(1))], false);

        // No input file at all.
        asm.set_output_file("out.pdf");
        asm.input_images(PageRange::new(1, 1).unwrap());
        assert_eq!(asm.report().statements_failed, 1);

        // Input set but unknown on disk.
        asm.set_input_file("missing.tif");
        asm.input_images(PageRange::new(1, 1).unwrap());
        assert_eq!(asm.report().statements_failed, 2);

        // A later valid statement still runs.
        asm.set_input_file("a.tif");
        asm.input_images(PageRange::new(1, 1).unwrap());
        let report = asm.finish();
        assert_eq!(report.pages_emitted, 1);
    }

    #[test]
    fn source_is_reused_until_the_file_changes() {
        let fx = fixture();
        let mut asm = fx.assembler(
            &[("a.tif", letter_pages(2)), ("b.tif", letter_pages(1))],
            false,
        );

        asm.set_input_file("a.tif");
        asm.set_output_file("out.pdf");
        asm.input_images(PageRange::new(1, 1).unwrap());
        asm.input_images(PageRange::new(2, 2).unwrap());
        assert_eq!(*fx.opens.borrow(), 1);

        asm.set_input_file("b.tif");
        asm.input_images(PageRange::new(1, 1).unwrap());
        assert_eq!(*fx.opens.borrow(), 2);
        asm.finish();
    }

    #[test]
    fn context_nesting_restores_parent_settings() {
        let fx = fixture();
        let mut asm = fx.assembler(
            &[("a.tif", letter_pages(1)), ("b.tif", letter_pages(1))],
            false,
        );

        asm.set_input_file("a.tif");
        asm.set_output_file("out.pdf");

        asm.push_input_context();
        asm.set_input_file("b.tif");
        asm.set_rotation(180).unwrap();
        asm.input_images(PageRange::new(1, 1).unwrap());
        asm.pop_input_context().unwrap();

        // Back to a.tif, rotation 0.
        asm.input_images(PageRange::new(1, 1).unwrap());
        let report = asm.finish();

        assert_eq!(report.pages_emitted, 2);
        assert_eq!(*fx.opens.borrow(), 2);
    }

    #[test]
    fn pop_without_push_is_fatal() {
        let fx = fixture();
        let mut asm = fx.assembler(&[], false);
        assert!(matches!(
            asm.pop_input_context().unwrap_err(),
            BindwerkError::StackUnderflow
        ));
        assert!(matches!(
            asm.pop_output_context().unwrap_err(),
            BindwerkError::StackUnderflow
        ));
    }

    #[test]
    fn invalid_rotation_is_rejected_and_context_unchanged() {
        let fx = fixture();
        let mut asm = fx.assembler(&[], false);
        asm.set_rotation(90).unwrap();
        assert!(asm.set_rotation(45).is_err());
        assert_eq!(asm.inputs.top().rotation, Rotation::R90);
    }

    #[test]
    fn poisoned_document_stops_receiving_pages_but_still_closes() {
        let fx = fixture();
        let mut asm = fx.assembler(&[("a.tif", letter_pages(4))], true);

        asm.set_input_file("a.tif");
        asm.set_output_file("bad.pdf");
        asm.input_images(PageRange::new(1, 4).unwrap());
        let report = asm.finish();

        assert_eq!(report.pages_emitted, 0);
        assert_eq!(report.pages_skipped, 4);
        // Only the first two pages ever reached the sink.
        assert_eq!(*fx.attempts.borrow(), 2);
        assert!(fx
            .log
            .borrow()
            .contains(&Event::Close("bad.pdf".into())));
    }
}
