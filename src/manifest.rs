//! Resource manifest parser.
//!
//! Streams a Qt-style resource collection:
//!
//! ```xml
//! <RCC>
//!     <qresource prefix="/pages">
//!         <file alias="Main.qml">src/pages/Main.qml</file>
//!     </qresource>
//! </RCC>
//! ```
//!
//! and emits one [`ResourceEntry`] per `<file>` that survives filtering.
//! Unknown elements and attributes are ignored.

use std::fs;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::errors::IllFormedError;
use quick_xml::events::{BytesRef, BytesStart, Event};

use crate::error::ManifestError;
use crate::resource::{Filters, ResourceEntry, display_path, normalize_prefix, virtual_path};
use crate::utils::path::{normalize_path, resolve_against};

const GROUP: &[u8] = b"qresource";
const FILE: &[u8] = b"file";
const PREFIX_ATTR: &[u8] = b"prefix";
const ALIAS_ATTR: &[u8] = b"alias";

/// Parse `manifest` into filtered entries.
///
/// All-or-nothing: any read or syntax error fails the whole parse.
pub fn parse(manifest: &Path, filters: &Filters) -> Result<Vec<ResourceEntry>, ManifestError> {
    let content = fs::read_to_string(manifest).map_err(|source| ManifestError::Io {
        path: manifest.to_path_buf(),
        source,
    })?;

    let base = normalize_path(manifest.parent().unwrap_or(Path::new("")));
    parse_str(&content, &base, filters).map_err(|(position, source)| ManifestError::Xml {
        path: manifest.to_path_buf(),
        position,
        source,
    })
}

type XmlResult<T> = Result<T, (u64, quick_xml::Error)>;

/// Parse manifest text. Relative file paths resolve against `base`.
pub fn parse_str(content: &str, base: &Path, filters: &Filters) -> XmlResult<Vec<ResourceEntry>> {
    // Text is trimmed per <file>, not per event: entity references split it
    let mut reader = Reader::from_str(content);

    let mut entries = Vec::new();
    let mut group: Option<ManifestPrefix> = None;
    let mut file: Option<FileElement> = None;
    // Depth inside an ignored group; everything is skipped while > 0
    let mut skip_depth = 0usize;
    // Elements still open; the reader itself accepts a document cut off at EOF
    let mut open: Vec<String> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| (reader.error_position() as u64, e))?;
        let at = reader.buffer_position() as u64;

        match &event {
            Event::Start(e) => {
                open.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Event::End(_) => {
                open.pop();
            }
            Event::Eof => {
                if let Some(unclosed) = open.pop() {
                    let missing = IllFormedError::MissingEndTag(unclosed);
                    return Err((at, quick_xml::Error::from(missing)));
                }
                break;
            }
            _ => {}
        }

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) if e.name().as_ref() == GROUP => {
                let prefix = attribute(&reader, &e, PREFIX_ATTR).map_err(|err| (at, err))?;
                let prefix = normalize_prefix(prefix.as_deref().unwrap_or_default());
                if filters.is_prefix_ignored(&prefix) {
                    crate::debug!("manifest"; "skipping ignored prefix {}", prefix);
                    skip_depth = 1;
                    continue;
                }
                group = Some(ManifestPrefix::new(prefix));
            }
            Event::End(e) if e.name().as_ref() == GROUP => {
                if let Some(finished) = group.take() {
                    entries.extend(finished.entries);
                }
            }
            Event::Start(e) if e.name().as_ref() == FILE => {
                let alias = attribute(&reader, &e, ALIAS_ATTR).map_err(|err| (at, err))?;
                file = Some(FileElement {
                    alias,
                    text: String::new(),
                });
            }
            Event::Empty(e) if e.name().as_ref() == FILE => {
                crate::debug!("manifest"; "skipping empty <file/> at byte {}", at);
            }
            Event::Text(text) => {
                if let Some(current) = file.as_mut() {
                    let decoded = text.decode().map_err(|e| (at, quick_xml::Error::from(e)))?;
                    current.text.push_str(&decoded);
                }
            }
            Event::CData(data) => {
                if let Some(current) = file.as_mut() {
                    let decoded = data.decode().map_err(|e| (at, quick_xml::Error::from(e)))?;
                    current.text.push_str(&decoded);
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(current) = file.as_mut() {
                    push_reference(&mut current.text, &reference).map_err(|e| (at, e))?;
                }
            }
            Event::End(e) if e.name().as_ref() == FILE => {
                let Some(finished) = file.take() else {
                    continue;
                };
                match group.as_mut() {
                    Some(current) => current.push_file(finished, base, filters),
                    None => {
                        crate::debug!("manifest"; "<file> outside <qresource> at byte {}", at);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(entries)
}

/// Group being read: normalized prefix plus the entries collected so far.
struct ManifestPrefix {
    prefix: String,
    entries: Vec<ResourceEntry>,
}

/// `<file>` being read.
struct FileElement {
    alias: Option<String>,
    text: String,
}

impl ManifestPrefix {
    fn new(prefix: String) -> Self {
        Self {
            prefix,
            entries: Vec::new(),
        }
    }

    fn push_file(&mut self, file: FileElement, base: &Path, filters: &Filters) {
        let relative = file.text.trim();
        if relative.is_empty() {
            crate::debug!("manifest"; "skipping <file> without a path in {}", self.prefix);
            return;
        }

        let name = file
            .alias
            .as_deref()
            .filter(|alias| !alias.trim().is_empty())
            .unwrap_or(relative);
        let display = display_path(&self.prefix, name);

        let relative_path = Path::new(relative);
        let suffix = relative_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if !filters.allows_suffix(suffix) {
            crate::debug!("manifest"; "skipping {} (suffix `{}` not allowed)", display, suffix);
            return;
        }

        let ignored = filters.is_ignored(&display);
        self.entries.push(ResourceEntry {
            virtual_path: virtual_path(&display),
            local_path: normalize_path(&resolve_against(relative_path, base)),
            suffix: suffix.to_string(),
            ignored,
        });
    }
}

fn attribute(
    reader: &Reader<&[u8]>,
    element: &BytesStart<'_>,
    key: &[u8],
) -> Result<Option<String>, quick_xml::Error> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            let value = attr.decode_and_unescape_value(reader.decoder())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Append the text an entity or character reference stands for.
fn push_reference(out: &mut String, reference: &BytesRef<'_>) -> Result<(), quick_xml::Error> {
    if let Some(ch) = reference.resolve_char_ref()? {
        out.push(ch);
        return Ok(());
    }
    let name = reference.decode()?;
    match quick_xml::escape::resolve_predefined_entity(&name) {
        Some(text) => out.push_str(text),
        None => {
            out.push('&');
            out.push_str(&name);
            out.push(';');
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn filters(suffixes: &[&str], ignore: &[&str], prefixes: &[&str]) -> Filters {
        let mut filters = Filters::empty();
        for s in suffixes {
            filters.allow_suffix(s);
        }
        for p in ignore {
            filters.ignore(p);
        }
        for p in prefixes {
            filters.ignore_prefix(p);
        }
        filters
    }

    fn parse_text(xml: &str, filters: &Filters) -> Vec<ResourceEntry> {
        parse_str(xml, Path::new("/project"), filters).unwrap()
    }

    #[test]
    fn test_pages_scenario() {
        let xml = r#"<RCC><qresource prefix="/pages"><file>Main.qml</file></qresource></RCC>"#;
        let entries = parse_text(xml, &filters(&["qml"], &["/pages/*"], &[]));

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].virtual_path, "res:/pages/Main.qml");
        assert_eq!(entries[0].local_path, PathBuf::from("/project/Main.qml"));
        assert_eq!(entries[0].suffix, "qml");
        assert!(entries[0].ignored);
    }

    #[test]
    fn test_root_prefix_and_missing_prefix() {
        let xml = r#"
            <RCC>
                <qresource prefix="/"><file>main.qml</file></qresource>
                <qresource><file>qml/Other.qml</file></qresource>
            </RCC>"#;
        let entries = parse_text(xml, &filters(&["qml"], &[], &[]));

        let paths: Vec<_> = entries.iter().map(|e| e.virtual_path.as_str()).collect();
        assert_eq!(paths, ["res:/main.qml", "res:/qml/Other.qml"]);
        assert_eq!(entries[1].local_path, PathBuf::from("/project/qml/Other.qml"));
        assert!(entries.iter().all(|e| !e.ignored));
    }

    #[test]
    fn test_alias_names_virtual_path() {
        let xml = r#"<RCC><qresource prefix="ui/"><file alias="Main.qml">src/ui/MainWindow.qml</file></qresource></RCC>"#;
        let entries = parse_text(xml, &filters(&["qml"], &[], &[]));

        assert_eq!(entries[0].virtual_path, "res:/ui/Main.qml");
        assert_eq!(
            entries[0].local_path,
            PathBuf::from("/project/src/ui/MainWindow.qml")
        );
    }

    #[test]
    fn test_absolute_local_path_kept() {
        let xml = r#"<RCC><qresource><file alias="a.qml">/opt/shared/a.qml</file></qresource></RCC>"#;
        let entries = parse_text(xml, &filters(&["qml"], &[], &[]));
        assert_eq!(entries[0].local_path, PathBuf::from("/opt/shared/a.qml"));
    }

    #[test]
    fn test_disallowed_suffix_never_added() {
        let xml = r#"
            <RCC><qresource prefix="/">
                <file>main.qml</file>
                <file>logic.js</file>
                <file>icon.png</file>
            </qresource></RCC>"#;
        let entries = parse_text(xml, &filters(&["qml", "js"], &[], &[]));

        let paths: Vec<_> = entries.iter().map(|e| e.virtual_path.as_str()).collect();
        assert_eq!(paths, ["res:/main.qml", "res:/logic.js"]);
    }

    #[test]
    fn test_ignored_group_skipped_wholesale() {
        let xml = r#"
            <RCC>
                <qresource prefix="/test">
                    <file>TestA.qml</file>
                    <file>nested/TestB.qml</file>
                </qresource>
                <qresource prefix="/app"><file>App.qml</file></qresource>
            </RCC>"#;
        let entries = parse_text(xml, &filters(&["qml"], &[], &["/test"]));

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].virtual_path, "res:/app/App.qml");
        assert!(!entries.iter().any(|e| e.virtual_path.starts_with("res:/test/")));
    }

    #[test]
    fn test_ignore_filter_on_display_path() {
        let xml = r#"
            <RCC><qresource prefix="/">
                <file>Page1.qml</file>
                <file>Page2.qml</file>
            </qresource></RCC>"#;
        let entries = parse_text(xml, &filters(&["qml"], &["/Page2.qml"], &[]));

        assert_eq!(entries.len(), 2);
        assert!(!entries[0].ignored);
        assert!(entries[1].ignored);
    }

    #[test]
    fn test_unknown_elements_and_attributes_tolerated() {
        let xml = r#"<?xml version="1.0"?>
            <!DOCTYPE RCC>
            <RCC version="1.0">
                <!-- comment -->
                <meta name="x"/>
                <qresource prefix="/" lang="en" extra="1">
                    <file compress="9" alias="main.qml">main.qml</file>
                    <note>ignored</note>
                </qresource>
            </RCC>"#;
        let entries = parse_text(xml, &filters(&["qml"], &[], &[]));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].virtual_path, "res:/main.qml");
    }

    #[test]
    fn test_entities_in_file_text() {
        let xml = r#"<RCC><qresource><file>a&amp;b.qml</file></qresource></RCC>"#;
        let entries = parse_text(xml, &filters(&["qml"], &[], &[]));
        assert_eq!(entries[0].local_path, PathBuf::from("/project/a&b.qml"));
    }

    #[test]
    fn test_url_delimiters_in_file_names_kept() {
        let xml = r#"<RCC><qresource prefix="/"><file>a#1.qml</file><file>a#2.qml</file><file>b?x.qml</file></qresource></RCC>"#;
        let entries = parse_text(xml, &filters(&["qml"], &[], &[]));

        let paths: Vec<_> = entries.iter().map(|e| e.virtual_path.as_str()).collect();
        assert_eq!(paths, ["res:/a#1.qml", "res:/a#2.qml", "res:/b?x.qml"]);

        let table = crate::resource::ResourceTable::from_entries(entries);
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.lookup("res:/a#1.qml"),
            Some(Path::new("/project/a#1.qml"))
        );
    }

    #[test]
    fn test_empty_file_elements_skipped() {
        let xml = r#"<RCC><qresource><file/><file>  </file><file>ok.qml</file></qresource></RCC>"#;
        let entries = parse_text(xml, &filters(&["qml"], &[], &[]));
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_mismatched_tags_fail() {
        let xml = r#"<RCC><qresource><file>main.qml</qresource></RCC>"#;
        assert!(parse_str(xml, Path::new("/project"), &Filters::default()).is_err());
    }

    #[test]
    fn test_truncated_manifest_fails() {
        let filters = filters(&["qml"], &[], &[]);
        let truncated = [
            r#"<RCC><qresource prefix="/"><file>main.qml</file><file>Page.qml</file>"#,
            r#"<RCC><qresource prefix="/"><file>main.qml</file></qresource>"#,
            r#"<RCC><qresource prefix="/"><file>main.q"#,
        ];
        for xml in truncated {
            assert!(parse_str(xml, Path::new("/project"), &filters).is_err(), "{xml}");
        }
    }

    #[test]
    fn test_truncated_inside_ignored_group_fails() {
        let xml = r#"<RCC><qresource prefix="/app"><file>App.qml</file></qresource><qresource prefix="/test"><file>T.qml</file>"#;
        let result = parse_str(xml, Path::new("/project"), &filters(&["qml"], &[], &["/test"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_file_resolves_against_manifest_dir() {
        let dir = TempDir::new().unwrap();
        let qml_dir = dir.path().join("qml");
        std::fs::create_dir_all(&qml_dir).unwrap();
        std::fs::write(qml_dir.join("main.qml"), "Item {}").unwrap();
        let manifest = dir.path().join("qml.qrc");
        std::fs::write(
            &manifest,
            r#"<RCC><qresource prefix="/"><file>qml/main.qml</file></qresource></RCC>"#,
        )
        .unwrap();

        let entries = parse(&manifest, &Filters::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].local_path,
            normalize_path(&qml_dir.join("main.qml"))
        );
    }

    #[test]
    fn test_missing_manifest_is_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.qrc");

        let err = parse(&missing, &Filters::default()).unwrap_err();
        assert!(matches!(&err, ManifestError::Io { path, .. } if path == &missing));
    }

    #[test]
    fn test_malformed_manifest_is_xml_error() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("bad.qrc");
        std::fs::write(&manifest, "<RCC><qresource></RCC>").unwrap();

        let err = parse(&manifest, &Filters::default()).unwrap_err();
        assert!(matches!(err, ManifestError::Xml { .. }));
    }
}
