//! Minimal text PDF writer.
//!
//! Produces a PDF 1.4 document with A4 pages, one built-in Helvetica font
//! and left-aligned lines. Characters outside printable ASCII are replaced
//! with `?` because the standard font has no Unicode mapping.

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const MARGIN: u32 = 50;
const TITLE_SIZE: u32 = 14;
const FONT_SIZE: u32 = 10;
const LEADING: u32 = 14;
const MAX_LINE_CHARS: usize = 95;

/// Lines that fit between the top and bottom margins.
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

/// Renders a title and body lines into a PDF document.
pub(crate) fn render_text_pdf(title: &str, lines: &[String]) -> Vec<u8> {
    let mut wrapped = Vec::with_capacity(lines.len() + 2);
    for line in lines {
        wrapped.extend(wrap_line(&sanitize(line)));
    }

    // Title and a blank line occupy the top of the first page.
    let first_page_capacity = LINES_PER_PAGE - 2;
    let mut pages: Vec<&[String]> = Vec::new();
    let (first, mut rest) = wrapped.split_at(first_page_capacity.min(wrapped.len()));
    pages.push(first);
    while !rest.is_empty() {
        let (page, tail) = rest.split_at(LINES_PER_PAGE.min(rest.len()));
        pages.push(page);
        rest = tail;
    }

    let title = sanitize(title);
    let streams: Vec<String> = pages
        .iter()
        .enumerate()
        .map(|(i, page)| page_stream((i == 0).then_some(title.as_str()), page))
        .collect();

    assemble(&streams)
}

fn page_stream(title: Option<&str>, lines: &[String]) -> String {
    let top = PAGE_HEIGHT - MARGIN;
    let mut ops = vec![
        "BT".to_string(),
        format!("{LEADING} TL"),
        format!("{MARGIN} {top} Td"),
    ];
    if let Some(title) = title {
        ops.push(format!("/F1 {TITLE_SIZE} Tf"));
        ops.push(format!("({}) Tj", escape(title)));
        ops.push("T* T*".to_string());
    }
    ops.push(format!("/F1 {FONT_SIZE} Tf"));
    ops.extend(lines.iter().map(|line| format!("({}) Tj T*", escape(line))));
    ops.push("ET".to_string());

    let mut stream = ops.join("\n");
    stream.push('\n');
    stream
}

/// Lays out objects: catalog, page tree, font, then a page and a content
/// stream per page.
fn assemble(streams: &[String]) -> Vec<u8> {
    let page_count = streams.len();
    let object_count = 3 + 2 * page_count;
    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(object_count);

    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", page_object_id(i)))
        .collect();

    offsets.push(out.len());
    out.push_str("1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

    offsets.push(out.len());
    out.push_str(&format!(
        "2 0 obj\n<< /Type /Pages /Kids [{}] /Count {page_count} >>\nendobj\n",
        kids.join(" ")
    ));

    offsets.push(out.len());
    out.push_str(
        "3 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica \
         /Encoding /WinAnsiEncoding >>\nendobj\n",
    );

    for (i, stream) in streams.iter().enumerate() {
        let page_id = page_object_id(i);
        let content_id = page_id + 1;

        offsets.push(out.len());
        out.push_str(&format!(
            "{page_id} 0 obj\n<< /Type /Page /Parent 2 0 R \
             /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {content_id} 0 R >>\nendobj\n"
        ));

        offsets.push(out.len());
        out.push_str(&format!(
            "{content_id} 0 obj\n<< /Length {} >>\nstream\n{stream}endstream\nendobj\n",
            stream.len()
        ));
    }

    let xref_offset = out.len();
    out.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", object_count + 1));
    for offset in &offsets {
        out.push_str(&format!("{offset:010} 00000 n \n"));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        object_count + 1
    ));

    out.into_bytes()
}

const fn page_object_id(page_index: usize) -> usize {
    4 + 2 * page_index
}

fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\t' => ' ',
            ' '..='~' => c,
            _ => '?',
        })
        .collect()
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '(' | ')' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn wrap_line(line: &str) -> Vec<String> {
    if line.len() <= MAX_LINE_CHARS {
        return vec![line.to_string()];
    }
    // Input is sanitized ASCII, so byte chunks are char boundaries.
    line.as_bytes()
        .chunks(MAX_LINE_CHARS)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}
