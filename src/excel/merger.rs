//! Create-or-update named sheets in an XLSX workbook
//!
//! The workbook is patched at the package level: only the workbook part, its relationships,
//! the content types and the targeted worksheets are rewritten. Every other part is carried
//! over byte for byte, so hand-made sheets keep their formatting and their formulas.

use super::package::{load_or_create, XlsxPackage};
use super::relationships::{
    self, Relationship, CALC_CHAIN_REL, CONTENT_TYPES_PART, WORKSHEET_CONTENT_TYPE, WORKSHEET_REL,
};
use super::sheet_name::{same_sheet_name, validate_sheet_name};
use super::sheet_writer::render_worksheet;
use super::workbook_xml::{self, SheetEntry};
use crate::error::{RegsheetError, RegsheetResult};
use crate::types::NamedResultSet;
use crate::writer::atomic_write_bytes;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What a merge did to the workbook
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergeReport {
    pub path: PathBuf,
    /// The file did not exist before the merge
    pub created: bool,
    /// Existing sheets whose content was replaced
    pub replaced: Vec<String>,
    /// Sheets appended to the workbook
    pub added: Vec<String>,
    /// Existing sheets left untouched
    pub preserved: Vec<String>,
}

impl MergeReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            ..Self::default()
        }
    }

    /// Number of sheets written by the merge
    pub fn written(&self) -> usize {
        self.replaced.len() + self.added.len()
    }
}

/// Publish every result in `results` as a sheet of the workbook at `path`.
///
/// A missing file is created. In an existing file, each named sheet is replaced in place
/// (same tab position) and every other sheet is preserved. The new file is written to a
/// temporary path and renamed over `path`, so either the whole merge lands or none of it.
pub fn merge(results: &NamedResultSet, path: &Path) -> RegsheetResult<MergeReport> {
    validate_result_set(results)?;

    let mut report = MergeReport::new(path);
    if results.is_empty() {
        warn!(path = %path.display(), "nothing to publish, workbook left as is");
        return Ok(report);
    }

    let loaded = load_or_create(path)?;
    report.created = loaded.is_fresh();
    let mut package = loaded.into_package();

    publish(&mut package, results, &mut report).map_err(|e| e.into_file_access(path))?;

    let bytes = package
        .write_to_bytes()
        .map_err(|e| e.into_file_access(path))?;
    atomic_write_bytes(path, &bytes).map_err(|e| RegsheetError::from(e).into_file_access(path))?;

    info!(
        path = %path.display(),
        created = report.created,
        replaced = report.replaced.len(),
        added = report.added.len(),
        preserved = report.preserved.len(),
        "workbook saved"
    );
    Ok(report)
}

/// Reject the whole set if any name is unusable, before anything is read or written
fn validate_result_set(results: &NamedResultSet) -> RegsheetResult<()> {
    let names = results.sheet_names();
    for (i, name) in names.iter().enumerate() {
        validate_sheet_name(name)?;
        if let Some(other) = names[..i].iter().find(|other| same_sheet_name(other, name)) {
            return Err(RegsheetError::InvalidSheetName {
                name: name.to_string(),
                reason: format!("collides with '{}' (sheet names ignore case)", other),
            });
        }
    }
    Ok(())
}

/// Apply `results` to the in-memory package
fn publish(
    package: &mut XlsxPackage,
    results: &NamedResultSet,
    report: &mut MergeReport,
) -> RegsheetResult<()> {
    let workbook_part = package.workbook_part()?;
    let workbook_rels_part = relationships::rels_part_for(&workbook_part);

    let mut workbook_xml = package.required_part_str(&workbook_part)?;
    let mut rels_xml = package.required_part_str(&workbook_rels_part)?;
    let mut content_types = package.required_part_str(CONTENT_TYPES_PART)?;

    let existing = workbook_xml::parse_sheets(&workbook_xml)?;
    let mut next_sheet_id = existing.iter().map(|s| s.sheet_id).max().unwrap_or(0) + 1;

    for (name, result) in results.iter() {
        let rendered = render_worksheet(result)?;
        let rels = relationships::parse_relationships(&rels_xml)?;

        match existing.iter().find(|s| same_sheet_name(&s.name, name)) {
            Some(sheet) => {
                let rel = rels
                    .iter()
                    .find(|r| r.id == sheet.rel_id && !r.external)
                    .ok_or_else(|| {
                        RegsheetError::Workbook(format!(
                            "sheet '{}' points at missing relationship {}",
                            sheet.name, sheet.rel_id
                        ))
                    })?;
                let part = relationships::resolve_target(&workbook_part, &rel.target);

                let dropped = drop_dependents(package, &mut content_types, &part)?;
                if !dropped.is_empty() {
                    debug!(sheet = %name, parts = ?dropped, "dropped parts owned by the old sheet");
                }

                package.set_part(part.clone(), rendered);
                content_types =
                    relationships::ensure_override(&content_types, &part, WORKSHEET_CONTENT_TYPE)?;
                // a chartsheet or dialog sheet becomes an ordinary worksheet
                if rel.rel_type != WORKSHEET_REL {
                    rels_xml =
                        relationships::set_relationship_type(&rels_xml, &rel.id, WORKSHEET_REL)?;
                }
                if sheet.name != name {
                    workbook_xml = workbook_xml::rename_sheet(&workbook_xml, &sheet.rel_id, name)?;
                }

                debug!(sheet = %name, part = %part, rows = result.len(), "replaced sheet");
                report.replaced.push(name.to_string());
            }
            None => {
                let part = next_worksheet_part(package, &workbook_part);
                let rel_id = relationships::next_relationship_id(&rels);

                rels_xml = relationships::append_relationship(
                    &rels_xml,
                    &Relationship {
                        id: rel_id.clone(),
                        rel_type: WORKSHEET_REL.to_string(),
                        target: relationships::relative_target(&workbook_part, &part),
                        external: false,
                    },
                )?;
                workbook_xml = workbook_xml::append_sheet(
                    &workbook_xml,
                    &SheetEntry {
                        name: name.to_string(),
                        sheet_id: next_sheet_id,
                        rel_id,
                    },
                )?;
                next_sheet_id += 1;

                content_types =
                    relationships::ensure_override(&content_types, &part, WORKSHEET_CONTENT_TYPE)?;
                package.set_part(part.clone(), rendered);

                debug!(sheet = %name, part = %part, rows = result.len(), "added sheet");
                report.added.push(name.to_string());
            }
        }
    }

    if !report.replaced.is_empty() {
        drop_calc_chain(
            package,
            &workbook_part,
            &mut rels_xml,
            &mut content_types,
        )?;
    }
    workbook_xml = workbook_xml::ensure_full_calc_on_load(&workbook_xml)?;

    report.preserved = existing
        .iter()
        .filter(|s| !results.iter().any(|(name, _)| same_sheet_name(&s.name, name)))
        .map(|s| s.name.clone())
        .collect();

    package.set_part(workbook_part, workbook_xml.into_bytes());
    package.set_part(workbook_rels_part, rels_xml.into_bytes());
    package.set_part(CONTENT_TYPES_PART, content_types.into_bytes());
    Ok(())
}

/// First free `worksheets/sheetN.xml` next to the workbook part
fn next_worksheet_part(package: &XlsxPackage, workbook_part: &str) -> String {
    (1..)
        .map(|k| relationships::resolve_target(workbook_part, &format!("worksheets/sheet{}.xml", k)))
        .find(|part| package.part(part).is_none())
        .unwrap_or_else(|| relationships::resolve_target(workbook_part, "worksheets/sheet.xml"))
}

/// Remove the relationships of a sheet being replaced, plus every part reachable only
/// through them (comments, drawings, tables, printer settings).
///
/// Parts still referenced from another `.rels` part are kept.
fn drop_dependents(
    package: &mut XlsxPackage,
    content_types: &mut String,
    sheet_part: &str,
) -> RegsheetResult<Vec<String>> {
    let mut dropped = Vec::new();
    let mut pending = release_relationships(package, sheet_part)?;

    while let Some(target) = pending.pop() {
        if target == sheet_part || package.part(&target).is_none() || is_referenced(package, &target)? {
            continue;
        }
        package.remove_part(&target);
        *content_types = relationships::remove_override(content_types, &target)?;
        pending.extend(release_relationships(package, &target)?);
        dropped.push(target);
    }

    Ok(dropped)
}

/// Delete `part`'s `.rels` part and return the internal parts it pointed at
fn release_relationships(package: &mut XlsxPackage, part: &str) -> RegsheetResult<Vec<String>> {
    let rels_part = relationships::rels_part_for(part);
    let Some(rels_xml) = package.part_str(&rels_part)? else {
        return Ok(Vec::new());
    };
    package.remove_part(&rels_part);

    Ok(relationships::parse_relationships(&rels_xml)?
        .into_iter()
        .filter(|r| !r.external)
        .map(|r| relationships::resolve_target(part, &r.target))
        .collect())
}

fn is_referenced(package: &XlsxPackage, target: &str) -> RegsheetResult<bool> {
    for name in package.part_names().filter(|n| n.ends_with(".rels")) {
        let Some(source) = relationships::source_part_for(name) else {
            continue;
        };
        let rels_xml = package.required_part_str(name)?;
        let referenced = relationships::parse_relationships(&rels_xml)?
            .iter()
            .any(|r| !r.external && relationships::resolve_target(&source, &r.target) == target);
        if referenced {
            return Ok(true);
        }
    }
    Ok(false)
}

/// The calculation chain lists formula cells by sheet; after a replacement it may name cells
/// that no longer hold formulas, which Excel reports as corruption.
fn drop_calc_chain(
    package: &mut XlsxPackage,
    workbook_part: &str,
    rels_xml: &mut String,
    content_types: &mut String,
) -> RegsheetResult<()> {
    for rel in relationships::parse_relationships(rels_xml)?
        .into_iter()
        .filter(|r| r.rel_type == CALC_CHAIN_REL)
    {
        let part = relationships::resolve_target(workbook_part, &rel.target);
        *rels_xml = relationships::remove_relationship(rels_xml, &rel.id)?;
        *content_types = relationships::remove_override(content_types, &part)?;
        package.remove_part(&part);
        debug!(part = %part, "dropped calculation chain");
    }
    Ok(())
}
