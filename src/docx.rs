//! DOCX serialization of a [`ReportDocument`].
//!
//! The package is assembled from raw WordprocessingML strings and zipped with the
//! `zip` crate. Parts written:
//!
//! | Part                            | Content                                       |
//! |---------------------------------|-----------------------------------------------|
//! | `[Content_Types].xml`           | part and extension content types              |
//! | `_rels/.rels`                   | main document and core properties             |
//! | `docProps/core.xml`             | title, creator, created date                  |
//! | `word/document.xml`             | body blocks and section properties            |
//! | `word/styles.xml`               | named paragraph styles                        |
//! | `word/settings.xml`             | `updateFields`, so fields refresh on open     |
//! | `word/footer1.xml`              | `Page {PAGE} of {NUMPAGES}`                   |
//! | `word/_rels/document.xml.rels`  | styles, settings, footer and every image      |
//! | `word/media/imageN.png`         | one per placeholder picture                   |

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use tracing::{debug, info};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::document::{Block, ParagraphStyle, ReportDocument};
use crate::error::Result;
use crate::placeholder::{PICTURE_HEIGHT_INCHES, PICTURE_WIDTH_INCHES};

const EMU_PER_INCH: f32 = 914_400.0;

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

// Fixed relationship ids of word/document.xml; images follow from IMAGE_REL_OFFSET.
const STYLES_REL: &str = "rId1";
const SETTINGS_REL: &str = "rId2";
const FOOTER_REL: &str = "rId3";
const IMAGE_REL_OFFSET: usize = 4;

/// Escape text for use in XML content and attributes.
pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Writes [`ReportDocument`]s as DOCX packages.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxWriter;

impl DocxWriter {
    /// Serialize `doc` into an in-memory DOCX package.
    pub fn to_bytes(&self, doc: &ReportDocument) -> Result<Vec<u8>> {
        let mut images: Vec<&[u8]> = Vec::new();
        let body = render_body(doc, &mut images);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut add = |name: &str, bytes: &[u8]| -> Result<()> {
            zip.start_file(name, options)?;
            zip.write_all(bytes)?;
            Ok(())
        };

        add("[Content_Types].xml", content_types().as_bytes())?;
        add("_rels/.rels", package_rels().as_bytes())?;
        add("docProps/core.xml", core_properties(doc).as_bytes())?;
        add("word/document.xml", document_xml(&body).as_bytes())?;
        add("word/styles.xml", styles_xml().as_bytes())?;
        add("word/settings.xml", settings_xml().as_bytes())?;
        add("word/footer1.xml", footer_xml().as_bytes())?;
        add("word/_rels/document.xml.rels", document_rels(images.len()).as_bytes())?;
        for (index, png) in images.iter().enumerate() {
            add(&format!("word/media/image{}.png", index + 1), png)?;
        }

        let bytes = zip.finish()?.into_inner();
        debug!(
            "DOCX package built: {} bytes, {} images",
            bytes.len(),
            images.len()
        );
        Ok(bytes)
    }

    /// Serialize `doc` and write it to `path`.
    pub fn write_to(&self, doc: &ReportDocument, path: &Path) -> Result<()> {
        let bytes = self.to_bytes(doc)?;
        fs::write(path, bytes)?;
        info!("Document saved as DOCX: {}", path.display());
        Ok(())
    }
}

fn render_body<'a>(doc: &'a ReportDocument, images: &mut Vec<&'a [u8]>) -> String {
    let mut out = String::new();
    for block in &doc.blocks {
        match block {
            Block::Paragraph { style, text } => out.push_str(&paragraph_xml(*style, text)),
            Block::Field { style, instruction } => out.push_str(&field_paragraph_xml(*style, instruction)),
            Block::PageBreak => out.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#),
            Block::Picture { label, png } => {
                images.push(png.as_slice());
                out.push_str(&picture_xml(images.len(), label));
            }
            Block::Table { rows, cols, filler } => out.push_str(&table_xml(*rows, *cols, filler)),
        }
        out.push('\n');
    }
    out
}

fn style_props(style: ParagraphStyle) -> String {
    format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, style.id())
}

/// Runs for `text`, with embedded newlines as line breaks.
fn text_runs(text: &str) -> String {
    text.split('\n')
        .enumerate()
        .map(|(i, line)| {
            let brk = if i > 0 { "<w:br/>" } else { "" };
            format!(
                r#"<w:r>{}<w:t xml:space="preserve">{}</w:t></w:r>"#,
                brk,
                escape_xml(line)
            )
        })
        .collect()
}

fn paragraph_xml(style: ParagraphStyle, text: &str) -> String {
    format!("<w:p>{}{}</w:p>", style_props(style), text_runs(text))
}

/// Complex field runs: begin, instruction, separate, cached result, end.
fn field_runs(instruction: &str, cached: &str) -> String {
    format!(
        concat!(
            r#"<w:r><w:fldChar w:fldCharType="begin" w:dirty="true"/></w:r>"#,
            r#"<w:r><w:instrText xml:space="preserve"> {} </w:instrText></w:r>"#,
            r#"<w:r><w:fldChar w:fldCharType="separate"/></w:r>"#,
            r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#,
            r#"<w:r><w:fldChar w:fldCharType="end"/></w:r>"#,
        ),
        escape_xml(instruction),
        escape_xml(cached)
    )
}

fn field_paragraph_xml(style: ParagraphStyle, instruction: &str) -> String {
    format!(
        "<w:p>{}{}</w:p>",
        style_props(style),
        field_runs(instruction, "Update fields to build the table of contents.")
    )
}

fn picture_xml(image_id: usize, label: &str) -> String {
    let cx = (PICTURE_WIDTH_INCHES * EMU_PER_INCH) as u64;
    let cy = (PICTURE_HEIGHT_INCHES * EMU_PER_INCH) as u64;
    let rel_id = format!("rId{}", image_id + IMAGE_REL_OFFSET - 1);
    let label = escape_xml(label);

    format!(
        r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:effectExtent l="0" t="0" r="0" b="0"/><wp:docPr id="{id}" name="{label}" descr="{label}"/><wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic><a:graphicData uri="{pic}"><pic:pic><pic:nvPicPr><pic:cNvPr id="{id}" name="{label}.png"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#,
        id = image_id,
        pic = NS_PIC,
    )
}

fn table_xml(rows: usize, cols: usize, filler: &str) -> String {
    let border = r#"w:val="single" w:sz="4" w:space="0" w:color="auto""#;
    let mut out = format!(
        r#"<w:tbl><w:tblPr><w:tblW w:w="5000" w:type="pct"/><w:tblBorders><w:top {b}/><w:left {b}/><w:bottom {b}/><w:right {b}/><w:insideH {b}/><w:insideV {b}/></w:tblBorders></w:tblPr><w:tblGrid>"#,
        b = border
    );
    for _ in 0..cols {
        out.push_str("<w:gridCol/>");
    }
    out.push_str("</w:tblGrid>");

    let cell = format!(
        "<w:tc><w:p>{}{}</w:p></w:tc>",
        style_props(ParagraphStyle::Normal),
        text_runs(filler)
    );
    for _ in 0..rows {
        out.push_str("<w:tr>");
        for _ in 0..cols {
            out.push_str(&cell);
        }
        out.push_str("</w:tr>");
    }
    out.push_str("</w:tbl>");
    // A table may not be the last body element before sectPr without a paragraph.
    out.push_str("<w:p/>");
    out
}

fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{w}" xmlns:r="{r}" xmlns:wp="{wp}" xmlns:a="{a}" xmlns:pic="{pic}">
<w:body>
{body}<w:sectPr><w:footerReference w:type="default" r:id="{footer}"/><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>
</w:body>
</w:document>"#,
        w = NS_W,
        r = NS_R,
        wp = NS_WP,
        a = NS_A,
        pic = NS_PIC,
        footer = FOOTER_REL,
    )
}

struct StyleDef {
    style: ParagraphStyle,
    name: &'static str,
    /// Half-points.
    size: u32,
    bold: bool,
    italic: bool,
    color: Option<&'static str>,
    centered: bool,
    /// Twentieths of a point.
    space_after: u32,
    outline_level: Option<u8>,
}

const STYLES: [StyleDef; 6] = [
    StyleDef {
        style: ParagraphStyle::Normal,
        name: "Normal",
        size: 22,
        bold: false,
        italic: false,
        color: None,
        centered: false,
        space_after: 120,
        outline_level: None,
    },
    StyleDef {
        style: ParagraphStyle::Title,
        name: "Title",
        size: 48,
        bold: true,
        italic: false,
        color: None,
        centered: true,
        space_after: 240,
        outline_level: None,
    },
    StyleDef {
        style: ParagraphStyle::Subtitle,
        name: "Subtitle",
        size: 36,
        bold: false,
        italic: true,
        color: Some("646464"),
        centered: true,
        space_after: 120,
        outline_level: None,
    },
    StyleDef {
        style: ParagraphStyle::Heading1,
        name: "heading 1",
        size: 32,
        bold: true,
        italic: false,
        color: None,
        centered: false,
        space_after: 240,
        outline_level: Some(0),
    },
    StyleDef {
        style: ParagraphStyle::Heading2,
        name: "heading 2",
        size: 28,
        bold: true,
        italic: false,
        color: None,
        centered: false,
        space_after: 120,
        outline_level: Some(1),
    },
    StyleDef {
        style: ParagraphStyle::Heading3,
        name: "heading 3",
        size: 24,
        bold: true,
        italic: false,
        color: None,
        centered: false,
        space_after: 120,
        outline_level: Some(2),
    },
];

fn style_xml(def: &StyleDef) -> String {
    let mut ppr = format!(
        r#"<w:spacing w:after="{}" w:line="240" w:lineRule="auto"/>"#,
        def.space_after
    );
    if def.centered {
        ppr.push_str(r#"<w:jc w:val="center"/>"#);
    }
    if let Some(level) = def.outline_level {
        ppr.push_str(&format!(r#"<w:outlineLvl w:val="{level}"/>"#));
    }

    let mut rpr = String::from(r#"<w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/>"#);
    if def.bold {
        rpr.push_str("<w:b/>");
    }
    if def.italic {
        rpr.push_str("<w:i/>");
    }
    if let Some(color) = def.color {
        rpr.push_str(&format!(r#"<w:color w:val="{color}"/>"#));
    }
    rpr.push_str(&format!(r#"<w:sz w:val="{0}"/><w:szCs w:val="{0}"/>"#, def.size));

    let default = if def.style == ParagraphStyle::Normal {
        r#" w:default="1""#
    } else {
        ""
    };
    let based_on = if def.style == ParagraphStyle::Normal {
        String::new()
    } else {
        r#"<w:basedOn w:val="Normal"/><w:next w:val="Normal"/>"#.to_string()
    };

    format!(
        r#"<w:style w:type="paragraph"{default} w:styleId="{id}"><w:name w:val="{name}"/>{based_on}<w:qFormat/><w:pPr>{ppr}</w:pPr><w:rPr>{rpr}</w:rPr></w:style>"#,
        id = def.style.id(),
        name = def.name,
    )
}

fn styles_xml() -> String {
    let styles: String = STYLES.iter().map(style_xml).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{w}"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:eastAsia="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/><w:szCs w:val="22"/><w:lang w:val="en-US"/></w:rPr></w:rPrDefault><w:pPrDefault/></w:docDefaults>{styles}<w:style w:type="paragraph" w:styleId="Footer"><w:name w:val="footer"/><w:basedOn w:val="Normal"/><w:pPr><w:jc w:val="center"/></w:pPr></w:style></w:styles>"#,
        w = NS_W,
    )
}

fn settings_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:settings xmlns:w="{NS_W}"><w:updateFields w:val="true"/><w:defaultTabStop w:val="720"/><w:compat/></w:settings>"#
    )
}

fn footer_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:ftr xmlns:w="{w}" xmlns:r="{r}"><w:p><w:pPr><w:pStyle w:val="Footer"/><w:jc w:val="center"/></w:pPr>{page_label}{page}{of}{pages}</w:p></w:ftr>"#,
        w = NS_W,
        r = NS_R,
        page_label = text_runs("Page "),
        page = field_runs("PAGE", "1"),
        of = text_runs(" of "),
        pages = field_runs("NUMPAGES", "1"),
    )
}

fn content_types() -> String {
    let main = "application/vnd.openxmlformats-officedocument.wordprocessingml";
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="png" ContentType="image/png"/>
  <Override PartName="/word/document.xml" ContentType="{main}.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="{main}.styles+xml"/>
  <Override PartName="/word/settings.xml" ContentType="{main}.settings+xml"/>
  <Override PartName="/word/footer1.xml" ContentType="{main}.footer+xml"/>
  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>"#
    )
}

fn package_rels() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="{REL_BASE}/officeDocument" Target="word/document.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#
    )
}

fn document_rels(image_count: usize) -> String {
    let mut rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="{STYLES_REL}" Type="{REL_BASE}/styles" Target="styles.xml"/>
  <Relationship Id="{SETTINGS_REL}" Type="{REL_BASE}/settings" Target="settings.xml"/>
  <Relationship Id="{FOOTER_REL}" Type="{REL_BASE}/footer" Target="footer1.xml"/>
"#
    );
    for n in 1..=image_count {
        rels.push_str(&format!(
            r#"  <Relationship Id="rId{}" Type="{REL_BASE}/image" Target="media/image{}.png"/>
"#,
            n + IMAGE_REL_OFFSET - 1,
            n
        ));
    }
    rels.push_str("</Relationships>");
    rels
}

fn core_properties(doc: &ReportDocument) -> String {
    let meta = &doc.metadata;
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dc:title>{title}</dc:title>
  <dc:creator>{author}</dc:creator>
  <dcterms:created xsi:type="dcterms:W3CDTF">{date}T00:00:00Z</dcterms:created>
</cp:coreProperties>"#,
        title = escape_xml(&meta.title),
        author = escape_xml(&meta.author),
        date = escape_xml(&meta.date),
    )
}
