//! # Invoice Rendering
//!
//! Turns a finalized order into a PDF invoice. Pure: takes the order
//! snapshot, the customer profile and the store details, returns bytes.
//!
//! ## Document Layout
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ OtherProteins                      (bold 20) │
//! │ store address / tax id / email               │
//! │                                              │
//! │ FAKTURA  OP-2026-000042                      │
//! │ Data / Egoera / Entrega                      │
//! │ Bezeroa: name, email, phone, address         │
//! │ ──────────────────────────────────────────── │
//! │ Produktua           Kop.  Prezioa   Guztira  │
//! │ Whey Protein Isolate   3  55,00 €   165,00 € │
//! │ ...                   (continues on next pg) │
//! │ ──────────────────────────────────────────── │
//! │                      Azpitotala   165,00 €   │
//! │                      Bidalketa      0,00 €   │
//! │                      GUZTIRA      165,00 €   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## PDF Subset
//! The writer emits PDF 1.4 with the two standard Helvetica faces
//! (regular and bold) in WinAnsi encoding, so no fonts are embedded.
//! Text outside WinAnsi is replaced by `?`.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderDetail};
use crate::types::{DeliveryMethod, UserProfile};

// =============================================================================
// Store Details
// =============================================================================

/// Seller block printed at the top of every invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDetails {
    pub name: String,
    pub address: String,
    pub tax_id: String,
    pub email: String,
}

impl Default for StoreDetails {
    fn default() -> Self {
        StoreDetails {
            name: "OtherProteins".to_string(),
            address: "Donostia, Gipuzkoa".to_string(),
            tax_id: "B00000000".to_string(),
            email: "info@otherproteins.eus".to_string(),
        }
    }
}

/// Invoice number: `OP-{year}-{order id, six digits}`.
pub fn invoice_number(order: &Order) -> String {
    format!("OP-{}-{:06}", order.created_at.year(), order.id)
}

// =============================================================================
// Rendering
// =============================================================================

const PAGE_WIDTH: i32 = 595;
const PAGE_HEIGHT: i32 = 842;
const MARGIN_LEFT: i32 = 50;
const MARGIN_RIGHT: i32 = PAGE_WIDTH - 50;
const TOP: i32 = PAGE_HEIGHT - 52;
const BOTTOM: i32 = 90;
const LINE_HEIGHT: i32 = 16;

const COL_QTY: i32 = 330;
const COL_PRICE: i32 = 390;
const COL_TOTAL: i32 = 470;

const MAX_NAME_CHARS: usize = 44;

/// Renders the invoice for `detail`.
///
/// `issued_at` is printed as the issue date; order dates come from the
/// order itself.
pub fn render_invoice(
    store: &StoreDetails,
    detail: &OrderDetail,
    customer: &UserProfile,
    issued_at: DateTime<Utc>,
) -> Vec<u8> {
    let order = &detail.order;
    let mut pages = PageSet::new();

    // Seller
    pages.text(Font::Bold, 20, MARGIN_LEFT, &store.name);
    pages.advance(LINE_HEIGHT + 4);
    for line in [&store.address, &format!("IFZ: {}", store.tax_id), &store.email] {
        pages.text(Font::Regular, 9, MARGIN_LEFT, line);
        pages.advance(12);
    }
    pages.advance(LINE_HEIGHT);

    // Invoice header
    pages.text(Font::Bold, 14, MARGIN_LEFT, &format!("FAKTURA  {}", invoice_number(order)));
    pages.advance(LINE_HEIGHT + 4);
    let facts = [
        format!("Eskaera data: {}", order.created_at.format("%Y-%m-%d %H:%M")),
        format!("Faktura data: {}", issued_at.format("%Y-%m-%d")),
        format!("Egoera: {}", order.status),
        format!(
            "Entrega: {}",
            match order.delivery_method {
                DeliveryMethod::Denda => "dendan jasotzea",
                DeliveryMethod::Etxera => "etxera bidalketa",
            }
        ),
    ];
    for fact in &facts {
        pages.text(Font::Regular, 10, MARGIN_LEFT, fact);
        pages.advance(14);
    }
    pages.advance(8);

    // Customer
    pages.text(Font::Bold, 11, MARGIN_LEFT, "Bezeroa");
    pages.advance(14);
    let mut customer_lines = vec![
        format!("{} {}", customer.first_name, customer.last_names),
        customer.email.clone(),
    ];
    if let Some(phone) = &customer.phone {
        customer_lines.push(format!("Tfnoa: {phone}"));
    }
    if let Some(walk_in) = &order.walk_in_customer {
        customer_lines.push(format!("Dendako bezeroa: {walk_in}"));
    }
    if let Some(address) = &order.address {
        customer_lines.push(address.one_line());
    }
    for line in &customer_lines {
        pages.text(Font::Regular, 10, MARGIN_LEFT, line);
        pages.advance(14);
    }
    pages.advance(10);

    // Lines
    pages.table_header();
    for line in &detail.lines {
        if pages.needs_break() {
            pages.break_page();
            pages.table_header();
        }
        pages.text(Font::Regular, 10, MARGIN_LEFT, &truncate(&line.product_name));
        pages.text(Font::Regular, 10, COL_QTY, &line.quantity.to_string());
        pages.text(Font::Regular, 10, COL_PRICE, &line.unit_price().to_string());
        pages.text(Font::Regular, 10, COL_TOTAL, &line.line_total().to_string());
        pages.advance(LINE_HEIGHT);
    }

    // Totals
    if pages.y - 4 * LINE_HEIGHT < BOTTOM {
        pages.break_page();
    }
    pages.rule();
    pages.advance(LINE_HEIGHT);
    for (font, label, amount) in [
        (Font::Regular, "Azpitotala", order.items_total()),
        (Font::Regular, "Bidalketa", order.shipping()),
        (Font::Bold, "GUZTIRA", order.grand_total()),
    ] {
        pages.text(font, 11, COL_PRICE - 60, label);
        pages.text(font, 11, COL_TOTAL, &amount.to_string());
        pages.advance(LINE_HEIGHT);
    }

    pages.advance(LINE_HEIGHT);
    pages.text(Font::Regular, 10, MARGIN_LEFT, "Eskerrik asko zure erosketagatik!");

    write_document(&pages.finish())
}

fn truncate(name: &str) -> String {
    if name.chars().count() <= MAX_NAME_CHARS {
        name.to_string()
    } else {
        let mut short: String = name.chars().take(MAX_NAME_CHARS - 3).collect();
        short.push_str("...");
        short
    }
}

// =============================================================================
// Page Layout
// =============================================================================

#[derive(Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Accumulates content streams, one per page, with a top-down cursor.
struct PageSet {
    done: Vec<Vec<u8>>,
    current: Vec<u8>,
    y: i32,
}

impl PageSet {
    fn new() -> Self {
        PageSet {
            done: Vec::new(),
            current: Vec::new(),
            y: TOP,
        }
    }

    fn text(&mut self, font: Font, size: u32, x: i32, text: &str) {
        self.current.extend_from_slice(
            format!("BT /{} {} Tf {} {} Td (", font.resource(), size, x, self.y).as_bytes(),
        );
        self.current.extend_from_slice(&encode_text(text));
        self.current.extend_from_slice(b") Tj ET\n");
    }

    fn rule(&mut self) {
        self.current.extend_from_slice(
            format!(
                "0.5 w {} {} m {} {} l S\n",
                MARGIN_LEFT,
                self.y + 4,
                MARGIN_RIGHT,
                self.y + 4
            )
            .as_bytes(),
        );
    }

    fn table_header(&mut self) {
        self.text(Font::Bold, 10, MARGIN_LEFT, "Produktua");
        self.text(Font::Bold, 10, COL_QTY, "Kop.");
        self.text(Font::Bold, 10, COL_PRICE, "Prezioa");
        self.text(Font::Bold, 10, COL_TOTAL, "Guztira");
        self.advance(6);
        self.rule();
        self.advance(LINE_HEIGHT);
    }

    fn advance(&mut self, dy: i32) {
        self.y -= dy;
    }

    fn needs_break(&self) -> bool {
        self.y < BOTTOM
    }

    fn break_page(&mut self) {
        self.done.push(std::mem::take(&mut self.current));
        self.y = TOP;
    }

    fn finish(mut self) -> Vec<Vec<u8>> {
        self.done.push(self.current);
        self.done
    }
}

// =============================================================================
// PDF Serialization
// =============================================================================

/// Maps text into a PDF literal string body in WinAnsi encoding.
fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            ' '..='~' => out.push(c as u8),
            '€' => out.push(0x80),
            '‘' => out.push(0x91),
            '’' => out.push(0x92),
            '“' => out.push(0x93),
            '”' => out.push(0x94),
            '•' => out.push(0x95),
            '–' => out.push(0x96),
            '—' => out.push(0x97),
            '\u{a0}'..='\u{ff}' => out.push(c as u32 as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

/// Byte buffer that records each object's offset for the xref table.
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut buf = Vec::with_capacity(4096);
        buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        PdfWriter {
            buf,
            offsets: Vec::new(),
        }
    }

    /// Appends the next object; objects must arrive in id order.
    fn object(&mut self, body: &[u8]) {
        self.offsets.push(self.buf.len());
        let id = self.offsets.len();
        self.buf
            .extend_from_slice(format!("{id} 0 obj\n").as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, content: &[u8]) {
        let mut body = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(b"\nendstream");
        self.object(&body);
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_at = self.buf.len();
        let size = self.offsets.len() + 1;

        self.buf
            .extend_from_slice(format!("xref\n0 {size}\n0000000000 65535 f \n").as_bytes());
        for offset in &self.offsets {
            self.buf
                .extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        self.buf.extend_from_slice(
            format!("trailer\n<< /Size {size} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n")
                .as_bytes(),
        );
        self.buf
    }
}

/// Object layout:
/// 1 catalog, 2 page tree, 3-4 fonts, then (page, content) pairs.
fn write_document(pages: &[Vec<u8>]) -> Vec<u8> {
    let page_id = |i: usize| 5 + 2 * i;
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", page_id(i)))
        .collect();

    let mut pdf = PdfWriter::new();
    pdf.object(b"<< /Type /Catalog /Pages 2 0 R >>");
    pdf.object(
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        )
        .as_bytes(),
    );
    pdf.object(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>");
    pdf.object(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
    );

    for (i, content) in pages.iter().enumerate() {
        pdf.object(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                page_id(i) + 1
            )
            .as_bytes(),
        );
        pdf.stream(content);
    }

    pdf.finish()
}

// =============================================================================
// Unit Tests
// =============================================================================
