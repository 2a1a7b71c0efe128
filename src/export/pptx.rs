//! PresentationML (`.pptx`) writer.
//!
//! The package holds one master, two layouts (title and title+content), a
//! theme, and the slides. Shapes carry explicit positions so slides render
//! without relying on inherited placeholder geometry.

use anyhow::Result;

use super::{package, truncate_chars, xml::escape, DECK_SUBTITLE, SLIDE_BODY_LIMIT};
use crate::models::Section;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const GROUP_HEADER: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

const THEME: &str = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F497D"/></a:dk2><a:lt2><a:srgbClr val="EEECE1"/></a:lt2><a:accent1><a:srgbClr val="4F81BD"/></a:accent1><a:accent2><a:srgbClr val="C0504D"/></a:accent2><a:accent3><a:srgbClr val="9BBB59"/></a:accent3><a:accent4><a:srgbClr val="8064A2"/></a:accent4><a:accent5><a:srgbClr val="4BACC6"/></a:accent5><a:accent6><a:srgbClr val="F79646"/></a:accent6><a:hlink><a:srgbClr val="0000FF"/></a:hlink><a:folHlink><a:srgbClr val="800080"/></a:folHlink></a:clrScheme><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>"#;

/// Slide geometry in EMU (4:3, 10in x 7.5in).
const SLIDE_CX: i64 = 9_144_000;
const SLIDE_CY: i64 = 6_858_000;

struct Frame {
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
}

const TITLE_SLIDE_TITLE: Frame = Frame { x: 685_800, y: 2_130_425, cx: 7_772_400, cy: 1_470_025 };
const TITLE_SLIDE_SUBTITLE: Frame = Frame { x: 1_371_600, y: 3_886_200, cx: 6_400_800, cy: 1_752_600 };
const CONTENT_TITLE: Frame = Frame { x: 457_200, y: 274_638, cx: 8_229_600, cy: 1_143_000 };
const CONTENT_BODY: Frame = Frame { x: 457_200, y: 1_600_200, cx: 8_229_600, cy: 4_525_963 };

/// Render a title slide and one content slide per section.
///
/// Slide bodies are cut to [`SLIDE_BODY_LIMIT`] characters.
pub fn render(title: &str, sections: &[Section]) -> Result<Vec<u8>> {
    let mut slides = Vec::with_capacity(sections.len() + 1);
    slides.push((1, title_slide(title)));
    for section in sections {
        let body = truncate_chars(&section.content, SLIDE_BODY_LIMIT);
        slides.push((2, content_slide(&section.heading, body)));
    }

    let mut parts = vec![
        ("[Content_Types].xml".to_string(), content_types(slides.len())),
        ("_rels/.rels".to_string(), rels(&[("rId1", "officeDocument", "ppt/presentation.xml")])),
        ("ppt/presentation.xml".to_string(), presentation(slides.len())),
        ("ppt/_rels/presentation.xml.rels".to_string(), presentation_rels(slides.len())),
        ("ppt/slideMasters/slideMaster1.xml".to_string(), slide_master()),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".to_string(),
            rels(&[
                ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                ("rId2", "slideLayout", "../slideLayouts/slideLayout2.xml"),
                ("rId3", "theme", "../theme/theme1.xml"),
            ]),
        ),
        ("ppt/slideLayouts/slideLayout1.xml".to_string(), slide_layout("title", "Title Slide")),
        ("ppt/slideLayouts/slideLayout2.xml".to_string(), slide_layout("obj", "Title and Content")),
        ("ppt/theme/theme1.xml".to_string(), format!("{XML_DECL}\n{THEME}")),
    ];
    for layout in 1..=2 {
        parts.push((
            format!("ppt/slideLayouts/_rels/slideLayout{layout}.xml.rels"),
            rels(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
        ));
    }
    for (index, (layout, xml)) in slides.into_iter().enumerate() {
        let n = index + 1;
        let layout_target = format!("../slideLayouts/slideLayout{layout}.xml");
        parts.push((format!("ppt/slides/slide{n}.xml"), xml));
        parts.push((
            format!("ppt/slides/_rels/slide{n}.xml.rels"),
            rels(&[("rId1", "slideLayout", layout_target.as_str())]),
        ));
    }

    package::write(&parts)
}

fn content_types(slide_count: usize) -> String {
    let pml = "application/vnd.openxmlformats-officedocument.presentationml";
    let mut overrides = format!(
        r#"<Override PartName="/ppt/presentation.xml" ContentType="{pml}.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="{pml}.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="{pml}.slideLayout+xml"/><Override PartName="/ppt/slideLayouts/slideLayout2.xml" ContentType="{pml}.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#
    );
    for n in 1..=slide_count {
        overrides.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="{pml}.slide+xml"/>"#
        ));
    }
    format!(
        r#"{XML_DECL}
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>{overrides}</Types>"#
    )
}

/// Relationship part from `(id, type suffix, target)` triples.
fn rels(entries: &[(&str, &str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, kind, target)| {
            format!(r#"<Relationship Id="{id}" Type="{REL_BASE}/{kind}" Target="{target}"/>"#)
        })
        .collect();
    format!(r#"{XML_DECL}
<Relationships xmlns="{REL_NS}">{body}</Relationships>"#)
}

fn presentation(slide_count: usize) -> String {
    // rId1 is the master, rId2 the theme; slides start at rId3
    let slide_ids: String = (0..slide_count)
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 3))
        .collect();
    format!(
        r#"{XML_DECL}
<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{slide_ids}</p:sldIdLst><p:sldSz cx="{SLIDE_CX}" cy="{SLIDE_CY}" type="screen4x3"/><p:notesSz cx="{SLIDE_CY}" cy="{SLIDE_CX}"/></p:presentation>"#
    )
}

fn presentation_rels(slide_count: usize) -> String {
    let mut entries = vec![
        ("rId1".to_string(), "slideMaster", "slideMasters/slideMaster1.xml".to_string()),
        ("rId2".to_string(), "theme", "theme/theme1.xml".to_string()),
    ];
    for n in 1..=slide_count {
        entries.push((format!("rId{}", n + 2), "slide", format!("slides/slide{n}.xml")));
    }
    let borrowed: Vec<(&str, &str, &str)> = entries
        .iter()
        .map(|(id, kind, target)| (id.as_str(), *kind, target.as_str()))
        .collect();
    rels(&borrowed)
}

fn slide_master() -> String {
    format!(
        r#"{XML_DECL}
<p:sldMaster {NS}><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>{GROUP_HEADER}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/><p:sldLayoutId id="2147483650" r:id="rId2"/></p:sldLayoutIdLst></p:sldMaster>"#
    )
}

fn slide_layout(kind: &str, name: &str) -> String {
    format!(
        r#"{XML_DECL}
<p:sldLayout {NS} type="{kind}" preserve="1"><p:cSld name="{name}"><p:spTree>{GROUP_HEADER}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn title_slide(title: &str) -> String {
    slide(&[
        shape(2, "Title 1", r#"<p:ph type="ctrTitle"/>"#, &TITLE_SLIDE_TITLE, 4400, title),
        shape(3, "Subtitle 2", r#"<p:ph type="subTitle" idx="1"/>"#, &TITLE_SLIDE_SUBTITLE, 2400, DECK_SUBTITLE),
    ])
}

fn content_slide(heading: &str, body: &str) -> String {
    slide(&[
        shape(2, "Title 1", r#"<p:ph type="title"/>"#, &CONTENT_TITLE, 3600, heading),
        shape(3, "Content Placeholder 2", r#"<p:ph idx="1"/>"#, &CONTENT_BODY, 1400, body),
    ])
}

fn slide(shapes: &[String]) -> String {
    let shapes = shapes.concat();
    format!(
        r#"{XML_DECL}
<p:sld {NS}><p:cSld><p:spTree>{GROUP_HEADER}{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

/// A text shape with one paragraph per line of `text`.
fn shape(id: u32, name: &str, placeholder: &str, frame: &Frame, size: u32, text: &str) -> String {
    let paragraphs: String = text
        .split('\n')
        .map(|line| {
            format!(
                r#"<a:p><a:r><a:rPr lang="en-US" sz="{size}" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                escape(line.trim_end_matches('\r'))
            )
        })
        .collect();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr>{placeholder}</p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm></p:spPr><p:txBody><a:bodyPr wrap="square"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#,
        x = frame.x,
        y = frame.y,
        cx = frame.cx,
        cy = frame.cy,
    )
}
