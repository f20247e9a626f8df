use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::MetsError;

// ── Working tree ──────────────────────────────────────────────────────────────

/// One directory in the physical structMap. A strict tree: no parent links.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingDirectory {
    /// Relative, forward-slash separated path accumulated from div labels.
    pub local_path: String,
    pub directories: Vec<WorkingDirectory>,
    pub files: Vec<WorkingFile>,
}

/// One file in the physical structMap.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingFile {
    /// Relative, forward-slash separated path from the file section FLocat.
    /// Keys the archival group's storage map.
    pub local_path: String,
    /// Human name: the METS label when one is present, otherwise the last
    /// path segment.
    pub name: String,
    /// MIME type from the file section.
    pub content_type: String,
}

/// Read-only navigator over a parsed METS document.
#[derive(Debug, Clone, PartialEq)]
pub struct MetsWrapper {
    /// Root of the physical directory tree.
    pub physical_structure: WorkingDirectory,
}

impl MetsWrapper {
    pub fn from_str(xml: &str) -> Result<Self, MetsError> {
        let files = read_file_section(xml)?;
        let physical_structure = read_physical_struct_map(xml, &files)?;
        Ok(MetsWrapper { physical_structure })
    }

    pub fn from_bytes(xml: &[u8]) -> Result<Self, MetsError> {
        let text = std::str::from_utf8(xml).map_err(|_| MetsError::Encoding)?;
        Self::from_str(text)
    }
}

// ── File section ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
struct FileInfo {
    href: String,
    mimetype: Option<String>,
}

fn attr(start: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, MetsError> {
    for a in start.attributes() {
        let a = a.map_err(|e| MetsError::Xml(e.to_string()))?;
        if a.key.local_name().as_ref() == name {
            let value = a
                .unescape_value()
                .map_err(|e| MetsError::Xml(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Collect `fileSec` entries: file ID → FLocat href plus MIME type.
fn read_file_section(xml: &str) -> Result<HashMap<String, FileInfo>, MetsError> {
    let mut reader = Reader::from_str(xml);
    let mut files = HashMap::new();

    let mut in_file_sec = false;
    let mut current_id: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                match e.local_name().as_ref() {
                    b"fileSec" => in_file_sec = true,
                    b"file" if in_file_sec => {
                        let id = attr(&e, b"ID")?.unwrap_or_default();
                        let mimetype = attr(&e, b"MIMETYPE")?;
                        files.insert(id.clone(), FileInfo { href: String::new(), mimetype });
                        current_id = Some(id);
                    }
                    b"FLocat" => {
                        if let (Some(id), Some(href)) = (current_id.as_ref(), attr(&e, b"href")?) {
                            if let Some(info) = files.get_mut(id) {
                                info.href = href;
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"fileSec" => in_file_sec = false,
                b"file" => current_id = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(MetsError::Xml(e.to_string())),
            Ok(_) => {}
        }
    }

    Ok(files)
}

// ── Physical structMap ────────────────────────────────────────────────────────

enum Frame {
    Dir(WorkingDirectory),
    Item,
}

/// Walk the `structMap TYPE="physical"` div tree, preserving document order.
fn read_physical_struct_map(
    xml: &str,
    files: &HashMap<String, FileInfo>,
) -> Result<WorkingDirectory, MetsError> {
    let mut reader = Reader::from_str(xml);

    let mut in_physical = false;
    let mut stack: Vec<Frame> = Vec::new();
    let mut pending_label: Option<String> = None;
    let mut root: Option<WorkingDirectory> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"structMap" => {
                    let kind = attr(&e, b"TYPE")?.unwrap_or_default();
                    in_physical = kind.eq_ignore_ascii_case("physical");
                }
                b"div" if in_physical => {
                    let kind = attr(&e, b"TYPE")?.unwrap_or_default();
                    let label = attr(&e, b"LABEL")?;
                    if kind.eq_ignore_ascii_case("Directory") {
                        let parent_path = innermost_dir_path(&stack);
                        let local_path = join_path(parent_path, label.as_deref());
                        stack.push(Frame::Dir(WorkingDirectory {
                            local_path,
                            ..WorkingDirectory::default()
                        }));
                    } else {
                        pending_label = label;
                        stack.push(Frame::Item);
                    }
                }
                b"fptr" if in_physical => {
                    add_file(&e, files, &mut stack, &pending_label)?;
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"div" if in_physical => {
                    let kind = attr(&e, b"TYPE")?.unwrap_or_default();
                    if kind.eq_ignore_ascii_case("Directory") {
                        let parent_path = innermost_dir_path(&stack);
                        let label = attr(&e, b"LABEL")?;
                        let dir = WorkingDirectory {
                            local_path: join_path(parent_path, label.as_deref()),
                            ..WorkingDirectory::default()
                        };
                        attach_dir(&mut stack, &mut root, dir);
                    }
                }
                b"fptr" if in_physical => {
                    add_file(&e, files, &mut stack, &pending_label)?;
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"structMap" => in_physical = false,
                b"div" if in_physical => match stack.pop() {
                    Some(Frame::Dir(dir)) => attach_dir(&mut stack, &mut root, dir),
                    Some(Frame::Item) => pending_label = None,
                    None => {}
                },
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(MetsError::Xml(e.to_string())),
            Ok(_) => {}
        }
    }

    root.ok_or(MetsError::MissingPhysicalStructMap)
}

/// Resolve an fptr against the file section and append the file to the
/// innermost open directory.
fn add_file(
    e: &BytesStart<'_>,
    files: &HashMap<String, FileInfo>,
    stack: &mut [Frame],
    pending_label: &Option<String>,
) -> Result<(), MetsError> {
    let Some(file_id) = attr(e, b"FILEID")? else {
        return Ok(());
    };
    let info = files
        .get(&file_id)
        .ok_or_else(|| MetsError::UnknownFileId(file_id.clone()))?;
    let name = pending_label
        .clone()
        .unwrap_or_else(|| last_segment(&info.href).to_string());
    let file = WorkingFile {
        local_path: info.href.clone(),
        name,
        content_type: info
            .mimetype
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    };
    if let Some(dir) = innermost_dir_mut(stack) {
        dir.files.push(file);
    }
    Ok(())
}

fn join_path(parent: &str, label: Option<&str>) -> String {
    match (parent.is_empty(), label.unwrap_or_default()) {
        (_, "") => parent.to_string(),
        (true, label) => label.to_string(),
        (false, label) => format!("{parent}/{label}"),
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn innermost_dir_path(stack: &[Frame]) -> &str {
    stack
        .iter()
        .rev()
        .find_map(|f| match f {
            Frame::Dir(d) => Some(d.local_path.as_str()),
            Frame::Item => None,
        })
        .unwrap_or("")
}

fn innermost_dir_mut(stack: &mut [Frame]) -> Option<&mut WorkingDirectory> {
    stack.iter_mut().rev().find_map(|f| match f {
        Frame::Dir(d) => Some(d),
        Frame::Item => None,
    })
}

/// A completed directory goes to its enclosing directory, or becomes the root.
fn attach_dir(
    stack: &mut [Frame],
    root: &mut Option<WorkingDirectory>,
    dir: WorkingDirectory,
) {
    if let Some(parent) = innermost_dir_mut(stack) {
        parent.directories.push(dir);
    } else if let Some(existing_root) = root.as_mut() {
        existing_root.directories.push(dir);
    } else {
        *root = Some(dir);
    }
}
