//! Minimal flowing-text PDF writer built on lopdf.
//!
//! Lines are laid out top to bottom in Helvetica; a new physical page starts
//! whenever the bottom margin is reached. Long lines are word-wrapped to the
//! configured character width.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use crate::config::ReportConfig;
use crate::export::sanitize::encode_latin1;
use crate::export::ExportError;

/// A4 in points
const A4_WIDTH: f32 = 595.0;
const A4_HEIGHT: f32 = 842.0;

/// Page geometry and typography for rendered reports
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub font_size: f32,
    pub line_height: f32,
    /// Maximum characters per line. Helvetica is proportional, so this is an
    /// approximation of the printable width: a line of wide glyphs (capitals,
    /// `W`, `M`) can run past the right margin when the width is set close to
    /// the page limit.
    pub wrap_width: usize,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::from_config(&ReportConfig::default())
    }
}

impl PageLayout {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            page_width: A4_WIDTH,
            page_height: A4_HEIGHT,
            // 10 mm
            margin: 28.35,
            font_size: config.font_size,
            line_height: config.line_height,
            wrap_width: config.wrap_width.max(1),
        }
    }

    /// Baseline of the first line on a page
    fn top(&self) -> f32 {
        self.page_height - self.margin - self.font_size
    }

    /// Number of lines that fit on one physical page
    pub fn lines_per_page(&self) -> usize {
        let usable = self.top() - self.margin;
        if usable <= 0.0 || self.line_height <= 0.0 {
            return 1;
        }
        (usable / self.line_height).floor() as usize + 1
    }
}

/// Accumulates text lines and lays them out onto physical pages
#[derive(Debug)]
pub struct PdfWriter {
    layout: PageLayout,
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    lines_on_page: usize,
}

impl PdfWriter {
    pub fn new(layout: PageLayout) -> Self {
        Self {
            layout,
            pages: Vec::new(),
            current: Vec::new(),
            lines_on_page: 0,
        }
    }

    /// Write `text`, wrapping it over as many lines as needed
    pub fn write_line(&mut self, text: &str) {
        for line in wrap_text(text, self.layout.wrap_width) {
            self.place(&line);
        }
    }

    /// Write an empty line
    pub fn blank_line(&mut self) {
        self.place("");
    }

    /// Physical pages used so far (including the one being filled)
    pub fn page_count(&self) -> usize {
        self.pages.len() + usize::from(self.lines_on_page > 0)
    }

    fn place(&mut self, line: &str) {
        if self.lines_on_page == self.layout.lines_per_page() {
            self.pages.push(std::mem::take(&mut self.current));
            self.lines_on_page = 0;
        }

        let y = self.layout.top() - self.lines_on_page as f32 * self.layout.line_height;
        self.lines_on_page += 1;

        if line.is_empty() {
            return;
        }

        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec!["F1".into(), Object::Real(self.layout.font_size.into())],
            ),
            Operation::new(
                "Td",
                vec![
                    Object::Real(self.layout.margin.into()),
                    Object::Real(y.into()),
                ],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(encode_latin1(line), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Serialize the document
    pub fn finish(mut self) -> Result<Vec<u8>, ExportError> {
        if self.lines_on_page > 0 || self.pages.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for operations in self.pages {
            let content = Content { operations }
                .encode()
                .map_err(|e| ExportError::Pdf(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(self.layout.page_width.into()),
                Object::Real(self.layout.page_height.into()),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        Ok(buffer)
    }
}

/// Split `text` into lines of at most `width` characters.
///
/// Embedded newlines are honoured, words are kept whole where possible and
/// words longer than `width` are split hard. Empty input yields one empty line.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > width {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
            if needed > width && current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(word.iter());
            current_len += word.len();
        }

        lines.push(current);
    }

    lines
}

/// Text shown on every page, in reading order (Latin-1 decoded)
#[cfg(test)]
pub(crate) fn rendered_lines(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    let mut lines = Vec::new();

    for page_id in doc.get_pages().values() {
        let content = Content::decode(&doc.get_page_content(*page_id).unwrap()).unwrap();
        for op in content.operations.iter().filter(|op| op.operator == "Tj") {
            if let Some(Object::String(text, _)) = op.operands.first() {
                lines.push(text.iter().map(|&b| b as char).collect());
            }
        }
    }

    lines
}
