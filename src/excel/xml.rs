//! Streaming XML edits on package parts
//!
//! Each helper rewrites one part with `quick-xml`, copying every event it does not touch
//! verbatim. When nothing matches, the input string is returned unchanged so untouched
//! parts stay byte-identical.

use crate::error::{RegsheetError, RegsheetResult};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

/// Strip a namespace prefix: `r:id` → `id`
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// Prefix of a qualified name including the colon: `x:sheets` → `x:`
fn prefix_of(name: &[u8]) -> String {
    match name.iter().position(|b| *b == b':') {
        Some(idx) => String::from_utf8_lossy(&name[..=idx]).into_owned(),
        None => String::new(),
    }
}

/// Unescaped value of the attribute whose full key is `key`
pub(crate) fn attr(e: &BytesStart<'_>, key: &[u8]) -> RegsheetResult<Option<String>> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Unescaped value of the first namespaced attribute with local name `local` (e.g. `r:id`)
pub(crate) fn prefixed_attr(e: &BytesStart<'_>, local: &[u8]) -> RegsheetResult<Option<String>> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key.contains(&b':') && !key.starts_with(b"xmlns") && local_name(key) == local {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Copy of `e` with attribute `key` set to `value` (replaced in place or appended)
pub(crate) fn with_attr(
    e: &BytesStart<'_>,
    key: &str,
    value: &str,
) -> RegsheetResult<BytesStart<'static>> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    let mut replaced = false;
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        if attr.key.as_ref() == key.as_bytes() {
            out.push_attribute((key, value));
            replaced = true;
        } else {
            out.push_attribute(attr);
        }
    }
    if !replaced {
        out.push_attribute((key, value));
    }
    Ok(out)
}

/// Append a `<child_local .../>` element as the last child of the first element whose local
/// name is `container`. The child reuses the container's namespace prefix.
pub(crate) fn append_child(
    xml: &str,
    container: &[u8],
    child_local: &str,
    attrs: &[(&str, &str)],
) -> RegsheetResult<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::new());

    let build_child = |container_name: &[u8]| {
        let mut child = BytesStart::new(format!("{}{}", prefix_of(container_name), child_local));
        for (key, value) in attrs {
            child.push_attribute((*key, *value));
        }
        child
    };

    let mut depth_in_container: Option<usize> = None;
    let mut inserted = false;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) if !inserted && depth_in_container.is_none() => {
                if e.local_name().as_ref() == container {
                    depth_in_container = Some(0);
                }
                writer.write_event(event.borrow())?;
            }
            Event::Start(_) if depth_in_container.is_some() => {
                depth_in_container = depth_in_container.map(|d| d + 1);
                writer.write_event(event.borrow())?;
            }
            Event::End(ref e) if depth_in_container == Some(0) => {
                writer.write_event(Event::Empty(build_child(e.name().as_ref())))?;
                writer.write_event(event.borrow())?;
                depth_in_container = None;
                inserted = true;
            }
            Event::End(_) if depth_in_container.is_some() => {
                depth_in_container = depth_in_container.map(|d| d - 1);
                writer.write_event(event.borrow())?;
            }
            Event::Empty(ref e)
                if !inserted
                    && depth_in_container.is_none()
                    && e.local_name().as_ref() == container =>
            {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                writer.write_event(Event::Start(e.borrow()))?;
                writer.write_event(Event::Empty(build_child(e.name().as_ref())))?;
                writer.write_event(Event::End(BytesEnd::new(name)))?;
                inserted = true;
            }
            _ => writer.write_event(event.borrow())?,
        }
    }

    if !inserted {
        return Err(RegsheetError::Workbook(format!(
            "element <{}> not found",
            String::from_utf8_lossy(container)
        )));
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

/// Drop every element with local name `local` for which `pred` holds, subtree included.
///
/// Returns the new XML and how many elements were removed.
pub(crate) fn remove_elements(
    xml: &str,
    local: &[u8],
    mut pred: impl FnMut(&BytesStart<'_>) -> RegsheetResult<bool>,
) -> RegsheetResult<(String, usize)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::new());

    let mut removed = 0;
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event()?;
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }
        match event {
            Event::Eof => break,
            Event::Empty(ref e) if e.local_name().as_ref() == local && pred(e)? => {
                removed += 1;
            }
            Event::Start(ref e) if e.local_name().as_ref() == local && pred(e)? => {
                removed += 1;
                skip_depth = 1;
            }
            _ => writer.write_event(event.borrow())?,
        }
    }

    if removed == 0 {
        return Ok((xml.to_string(), 0));
    }
    Ok((String::from_utf8(writer.into_inner())?, removed))
}

/// Rewrite the tags of elements with local name `local`. `f` returns the replacement tag,
/// or `None` to keep the original. The replacement must keep the element's name.
///
/// Returns the new XML and how many tags were rewritten.
pub(crate) fn rewrite_elements(
    xml: &str,
    local: &[u8],
    mut f: impl FnMut(&BytesStart<'_>) -> RegsheetResult<Option<BytesStart<'static>>>,
) -> RegsheetResult<(String, usize)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::new());

    let mut rewritten = 0;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Eof => break,
            Event::Empty(ref e) if e.local_name().as_ref() == local => match f(e)? {
                Some(replacement) => {
                    rewritten += 1;
                    writer.write_event(Event::Empty(replacement))?;
                }
                None => writer.write_event(event.borrow())?,
            },
            Event::Start(ref e) if e.local_name().as_ref() == local => match f(e)? {
                Some(replacement) => {
                    rewritten += 1;
                    writer.write_event(Event::Start(replacement))?;
                }
                None => writer.write_event(event.borrow())?,
            },
            _ => writer.write_event(event.borrow())?,
        }
    }

    if rewritten == 0 {
        return Ok((xml.to_string(), 0));
    }
    Ok((String::from_utf8(writer.into_inner())?, rewritten))
}

/// Collect every element with local name `local`, via `f`
pub(crate) fn collect_elements<T>(
    xml: &str,
    local: &[u8],
    mut f: impl FnMut(&BytesStart<'_>) -> RegsheetResult<T>,
) -> RegsheetResult<Vec<T>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut out = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == local => {
                out.push(f(e)?);
            }
            _ => {}
        }
    }

    Ok(out)
}
