// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF sink — assemble output documents with `lopdf`, one full-bleed Group 4
// image per page.
//
// The document is built object by object in memory and serialised once at
// close. Image streams go in as raw CCITTFaxDecode data (K = -1); with the
// filter's default BlackIs1 = false, decoded 0-bits are black, which matches
// DeviceGray, so no /Decode array is needed.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, info, instrument};

use bindwerk_core::error::{BindwerkError, Result};
use bindwerk_core::{DocumentMetadata, PageGeometry, PageLabel};

use crate::sink::{DocumentSink, SinkDocument};

/// Opens [`PdfDocument`]s. Stateless; one value serves a whole run.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfSink;

impl DocumentSink for PdfSink {
    fn open(&self, path: &Path, metadata: &DocumentMetadata) -> Result<Box<dyn SinkDocument>> {
        Ok(Box::new(PdfDocument::create(path, metadata)?))
    }
}

/// A PDF document under construction.
#[derive(Debug)]
pub struct PdfDocument {
    path: PathBuf,
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    bookmarks: Vec<(u32, String)>,
    page_labels: Vec<(u32, PageLabel)>,
    closed: bool,
}

impl PdfDocument {
    /// Start a new document. The target path is probed immediately so that an
    /// unwritable location fails at open time, not at the end of the run.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn create(path: impl AsRef<Path>, metadata: &DocumentMetadata) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        File::create(&path).map_err(|err| BindwerkError::CannotCreateOutput {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut inf = dictionary! {
            "Producer" => Object::string_literal(concat!("bindwerk ", env!("CARGO_PKG_VERSION"))),
            "CreationDate" => Object::string_literal(format!("D:{}Z", Utc::now().format("%Y%m%d%H%M%S"))),
        };
        let text_fields = [
            ("Author", &metadata.author),
            ("Creator", &metadata.creator),
            ("Title", &metadata.title),
            ("Subject", &metadata.subject),
            ("Keywords", &metadata.keywords),
        ];
        for (key, value) in text_fields {
            if let Some(value) = value {
                inf.set(key, Object::string_literal(value.clone()));
            }
        }
        let info_id = doc.add_object(inf);
        doc.trailer.set("Info", info_id);

        info!("PDF document opened");
        Ok(Self {
            path,
            doc,
            pages_id,
            page_ids: Vec::new(),
            bookmarks: Vec::new(),
            page_labels: Vec::new(),
            closed: false,
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(BindwerkError::Sink(format!(
                "document '{}' is already closed",
                self.path.display()
            )));
        }
        Ok(())
    }

    fn check_page(&self, page: u32) -> Result<()> {
        if page as usize >= self.page_ids.len() {
            return Err(BindwerkError::Sink(format!(
                "page {} out of range ({} pages in '{}')",
                page,
                self.page_ids.len(),
                self.path.display()
            )));
        }
        Ok(())
    }
}

impl SinkDocument for PdfDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    fn add_page(&mut self, geometry: &PageGeometry, image: &[u8]) -> Result<u32> {
        self.check_open()?;

        let image_id = self.doc.add_object(Object::Stream(
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => geometry.dest_width_px as i64,
                    "Height" => geometry.dest_height_px as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 1,
                    "Filter" => "CCITTFaxDecode",
                    "DecodeParms" => dictionary! {
                        "K" => -1,
                        "Columns" => geometry.dest_width_px as i64,
                        "Rows" => geometry.dest_height_px as i64,
                    },
                },
                image.to_vec(),
            )
            .with_compression(false),
        ));

        // Scale the unit image square up to the page and paint it at the
        // origin: full bleed, no margins.
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Integer(geometry.width_pt as i64),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(geometry.height_pt as i64),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content
            .encode()
            .map_err(|err| BindwerkError::Sink(format!("content encode failed: {err}")))?;
        let content_id = self
            .doc
            .add_object(Object::Stream(Stream::new(dictionary! {}, content_bytes)));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(geometry.width_pt as i64),
                Object::Integer(geometry.height_pt as i64),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
            "Contents" => content_id,
        });
        self.page_ids.push(page_id);

        let index = self.page_ids.len() as u32 - 1;
        debug!(
            page = index,
            width_pt = geometry.width_pt,
            height_pt = geometry.height_pt,
            image_bytes = image.len(),
            "page appended"
        );
        Ok(index)
    }

    fn add_bookmark(&mut self, page: u32, title: &str) -> Result<()> {
        self.check_open()?;
        self.check_page(page)?;
        self.bookmarks.push((page, title.to_string()));
        Ok(())
    }

    fn add_page_label(&mut self, page: u32, label: &PageLabel) -> Result<()> {
        self.check_open()?;
        self.check_page(page)?;
        self.page_labels.push((page, label.clone()));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.page_ids.len() as i64,
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        };
        if !self.bookmarks.is_empty() {
            let outlines_id = build_outlines(&mut self.doc, &self.page_ids, &self.bookmarks);
            catalog.set("Outlines", outlines_id);
        }
        if !self.page_labels.is_empty() {
            catalog.set("PageLabels", build_page_labels(&self.page_labels));
        }
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", catalog_id);

        self.doc
            .save(&self.path)
            .map_err(|err| BindwerkError::Sink(format!(
                "cannot write '{}': {err}",
                self.path.display()
            )))?;

        info!(
            path = %self.path.display(),
            pages = self.page_ids.len(),
            bookmarks = self.bookmarks.len(),
            "PDF document written"
        );
        self.closed = true;
        Ok(())
    }
}

/// Build a flat outline (one level, no nesting) from bookmark entries, in
/// the order they were attached.
fn build_outlines(
    doc: &mut Document,
    page_ids: &[ObjectId],
    bookmarks: &[(u32, String)],
) -> ObjectId {
    let outlines_id = doc.new_object_id();
    let item_ids: Vec<ObjectId> = bookmarks.iter().map(|_| doc.new_object_id()).collect();

    for (i, (page, title)) in bookmarks.iter().enumerate() {
        let mut item = dictionary! {
            "Title" => Object::string_literal(title.clone()),
            "Parent" => outlines_id,
            "Dest" => vec![
                Object::Reference(page_ids[*page as usize]),
                Object::Name(b"Fit".to_vec()),
            ],
        };
        if i > 0 {
            item.set("Prev", item_ids[i - 1]);
        }
        if i + 1 < item_ids.len() {
            item.set("Next", item_ids[i + 1]);
        }
        doc.objects.insert(item_ids[i], Object::Dictionary(item));
    }

    doc.objects.insert(
        outlines_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => item_ids[0],
            "Last" => *item_ids.last().expect("bookmarks are non-empty"),
            "Count" => item_ids.len() as i64,
        }),
    );
    outlines_id
}

/// Build the /PageLabels number tree. The format string is attached verbatim
/// as the label prefix; only the start number is interpreted.
fn build_page_labels(labels: &[(u32, PageLabel)]) -> Dictionary {
    let mut sorted = labels.to_vec();
    sorted.sort_by_key(|(page, _)| *page);

    let mut nums: Vec<Object> = Vec::new();
    for (i, (page, label)) in sorted.iter().enumerate() {
        // A later label on the same page supersedes an earlier one.
        if i + 1 < sorted.len() && sorted[i + 1].0 == *page {
            continue;
        }
        let mut entry = dictionary! { "St" => label.base.max(1) as i64 };
        if !label.format.is_empty() {
            entry.set("P", Object::string_literal(label.format.clone()));
        }
        nums.push(Object::Integer(*page as i64));
        nums.push(entry.into());
    }
    dictionary! { "Nums" => nums }
}
