//! OPC relationships (`*.rels`) and `[Content_Types].xml`

use super::xml;
use crate::error::RegsheetResult;

pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub(crate) const ROOT_RELS_PART: &str = "_rels/.rels";

pub(crate) const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub(crate) const WORKSHEET_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
pub(crate) const CALC_CHAIN_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain";

pub(crate) const WORKSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

pub(crate) fn parse_relationships(rels_xml: &str) -> RegsheetResult<Vec<Relationship>> {
    xml::collect_elements(rels_xml, b"Relationship", |e| {
        Ok(Relationship {
            id: xml::attr(e, b"Id")?.unwrap_or_default(),
            rel_type: xml::attr(e, b"Type")?.unwrap_or_default(),
            target: xml::attr(e, b"Target")?.unwrap_or_default(),
            external: xml::attr(e, b"TargetMode")?.as_deref() == Some("External"),
        })
    })
}

pub(crate) fn append_relationship(rels_xml: &str, rel: &Relationship) -> RegsheetResult<String> {
    xml::append_child(
        rels_xml,
        b"Relationships",
        "Relationship",
        &[
            ("Id", rel.id.as_str()),
            ("Type", rel.rel_type.as_str()),
            ("Target", rel.target.as_str()),
        ],
    )
}

pub(crate) fn remove_relationship(rels_xml: &str, id: &str) -> RegsheetResult<String> {
    let (out, _) = xml::remove_elements(rels_xml, b"Relationship", |e| {
        Ok(xml::attr(e, b"Id")?.as_deref() == Some(id))
    })?;
    Ok(out)
}

pub(crate) fn set_relationship_type(
    rels_xml: &str,
    id: &str,
    rel_type: &str,
) -> RegsheetResult<String> {
    let (out, _) = xml::rewrite_elements(rels_xml, b"Relationship", |e| {
        if xml::attr(e, b"Id")?.as_deref() != Some(id) {
            return Ok(None);
        }
        Ok(Some(xml::with_attr(e, "Type", rel_type)?))
    })?;
    Ok(out)
}

/// First relationship id of the form `rIdN` not already taken
pub(crate) fn next_relationship_id(rels: &[Relationship]) -> String {
    (1..)
        .map(|n| format!("rId{}", n))
        .find(|candidate| rels.iter().all(|r| &r.id != candidate))
        .unwrap_or_else(|| "rId1".to_string())
}

/// The `.rels` part describing `part`'s relationships: `xl/workbook.xml` →
/// `xl/_rels/workbook.xml.rels`
pub(crate) fn rels_part_for(part: &str) -> String {
    match part.rfind('/') {
        Some(idx) => format!("{}/_rels/{}.rels", &part[..idx], &part[idx + 1..]),
        None => format!("_rels/{}.rels", part),
    }
}

/// The part a `.rels` part belongs to: `xl/_rels/workbook.xml.rels` → `xl/workbook.xml`
pub(crate) fn source_part_for(rels_part: &str) -> Option<String> {
    let file = rels_part.strip_suffix(".rels")?;
    let (dir, name) = match file.rfind('/') {
        Some(idx) => (&file[..idx], &file[idx + 1..]),
        None => ("", file),
    };
    let dir = dir.strip_suffix("_rels")?.trim_end_matches('/');
    Some(if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    })
}

/// Resolve a relationship target against the part that owns the relationship.
///
/// Absolute targets (`/xl/...`) are package-rooted; relative ones are resolved against the
/// source part's directory, with `..` segments collapsed.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    if !target.starts_with('/') {
        if let Some(idx) = source_part.rfind('/') {
            segments.extend(source_part[..idx].split('/'));
        }
    }
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Path of `part` relative to `source_part`'s directory, for writing `Target` attributes
pub(crate) fn relative_target(source_part: &str, part: &str) -> String {
    match source_part.rfind('/') {
        Some(idx) => part
            .strip_prefix(&source_part[..=idx])
            .map(str::to_string)
            .unwrap_or_else(|| format!("/{}", part)),
        None => part.to_string(),
    }
}

//==============================================================================
// [Content_Types].xml
//==============================================================================

fn part_name_matches(attr_value: Option<String>, part: &str) -> bool {
    attr_value
        .map(|v| v.trim_start_matches('/').eq_ignore_ascii_case(part))
        .unwrap_or(false)
}

/// Make sure `part` has an `<Override>` with `content_type`
pub(crate) fn ensure_override(
    content_types_xml: &str,
    part: &str,
    content_type: &str,
) -> RegsheetResult<String> {
    let mut found = false;
    let (out, _) = xml::rewrite_elements(content_types_xml, b"Override", |e| {
        if !part_name_matches(xml::attr(e, b"PartName")?, part) {
            return Ok(None);
        }
        found = true;
        if xml::attr(e, b"ContentType")?.as_deref() == Some(content_type) {
            return Ok(None);
        }
        Ok(Some(xml::with_attr(e, "ContentType", content_type)?))
    })?;
    if found {
        return Ok(out);
    }

    let part_name = format!("/{}", part);
    xml::append_child(
        content_types_xml,
        b"Types",
        "Override",
        &[("PartName", part_name.as_str()), ("ContentType", content_type)],
    )
}

pub(crate) fn remove_override(content_types_xml: &str, part: &str) -> RegsheetResult<String> {
    let (out, _) = xml::remove_elements(content_types_xml, b"Override", |e| {
        Ok(part_name_matches(xml::attr(e, b"PartName")?, part))
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES_REL: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain" Target="calcChain.xml"/><Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/></Relationships>"#;

    #[test]
    fn test_parse_relationships() {
        let rels = parse_relationships(RELS).unwrap();
        assert_eq!(rels.len(), 3);
        assert_eq!(rels[0].id, "rId1");
        assert_eq!(rels[0].rel_type, WORKSHEET_REL);
        assert_eq!(rels[0].target, "worksheets/sheet1.xml");
        assert!(!rels[0].external);
        assert!(rels[2].external);
    }

    #[test]
    fn test_next_relationship_id_fills_gaps() {
        let rels = parse_relationships(RELS).unwrap();
        assert_eq!(next_relationship_id(&rels), "rId2");
        assert_eq!(next_relationship_id(&[]), "rId1");
    }

    #[test]
    fn test_append_and_remove_relationship() {
        let rel = Relationship {
            id: "rId2".to_string(),
            rel_type: WORKSHEET_REL.to_string(),
            target: "worksheets/sheet2.xml".to_string(),
            external: false,
        };
        let added = append_relationship(RELS, &rel).unwrap();
        let rels = parse_relationships(&added).unwrap();
        assert_eq!(rels.len(), 4);
        assert_eq!(rels[3], rel);

        let removed = remove_relationship(&added, "rId3").unwrap();
        let ids: Vec<String> = parse_relationships(&removed)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["rId1", "rId9", "rId2"]);
    }

    #[test]
    fn test_set_relationship_type() {
        let out = set_relationship_type(RELS, "rId3", STYLES_REL).unwrap();
        let rels = parse_relationships(&out).unwrap();
        assert_eq!(rels[1].rel_type, STYLES_REL);
        assert_eq!(rels[0].rel_type, WORKSHEET_REL);
    }

    #[test]
    fn test_rels_part_paths() {
        assert_eq!(rels_part_for("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(
            rels_part_for("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
        assert_eq!(
            source_part_for("xl/worksheets/_rels/sheet1.xml.rels").as_deref(),
            Some("xl/worksheets/sheet1.xml")
        );
        assert_eq!(source_part_for("_rels/.rels").as_deref(), Some(""));
        assert_eq!(source_part_for("xl/workbook.xml"), None);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/workbook.xml", "/xl/worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets/sheet1.xml", "../drawings/drawing1.xml"),
            "xl/drawings/drawing1.xml"
        );
        assert_eq!(resolve_target("", "xl/workbook.xml"), "xl/workbook.xml");
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(
            relative_target("xl/workbook.xml", "xl/worksheets/sheet2.xml"),
            "worksheets/sheet2.xml"
        );
        assert_eq!(
            relative_target("xl/workbook.xml", "other/sheet.xml"),
            "/other/sheet.xml"
        );
    }

    const TYPES: &str = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/></Types>"#;

    #[test]
    fn test_ensure_override_appends_once() {
        let out = ensure_override(TYPES, "xl/worksheets/sheet1.xml", WORKSHEET_CONTENT_TYPE).unwrap();
        assert!(out.contains(r#"<Override PartName="/xl/worksheets/sheet1.xml""#));

        let again = ensure_override(&out, "xl/worksheets/sheet1.xml", WORKSHEET_CONTENT_TYPE).unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn test_ensure_override_fixes_content_type() {
        let out = ensure_override(TYPES, "xl/calcChain.xml", WORKSHEET_CONTENT_TYPE).unwrap();
        assert!(out.contains(WORKSHEET_CONTENT_TYPE));
        assert!(!out.contains("calcChain+xml"));
    }

    #[test]
    fn test_remove_override() {
        let out = remove_override(TYPES, "xl/calcChain.xml").unwrap();
        assert!(!out.contains("calcChain"));
        assert!(out.contains(r#"<Default Extension="xml""#));
    }
}
