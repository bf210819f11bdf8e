use super::*;
use std::fs;
use std::path::Path;

use crate::transport::{Connector, MirrorConnector, MirrorSession, ReconnectingSession};

/// Counts listing calls reaching the mirror.
struct Counting { inner: MirrorSession, lists: usize }

impl Transport for Counting {
    fn list_directory(&mut self, literal_path: &str) -> AsicResult<Vec<String>> {
        self.lists += 1;
        self.inner.list_directory(literal_path)
    }
    fn retrieve_to_local(&mut self, remote_path: &str, local_path: &Path) -> AsicResult<()> {
        self.inner.retrieve_to_local(remote_path, local_path)
    }
}

fn touch(root: &Path, rel: &str) {
    let p = root.join(rel.trim_start_matches('/'));
    fs::create_dir_all(p.parent().unwrap()).unwrap();
    fs::write(p, b"x").unwrap();
}

fn mirror() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for rel in [
        "/PUBLICOK/SIC/COMERCIA/2023-10/adem1001.tx2",
        "/PUBLICOK/SIC/COMERCIA/2023-10/adem1031.txf",
        "/PUBLICOK/SIC/COMERCIA/2023-10/adem1031.tx2",
        "/PUBLICOK/SIC/COMERCIA/2023-10/trsd1002.tx2",
        "/PUBLICOK/SIC/COMERCIA/2023-10/trsm10.txr",
        "/PUBLICOK/SIC/COMERCIA/2023-10/LEEME.txt",
        "/USUARIOSK/enbc/SIC/COMERCIA/2023-10/aenc1001.tx2",
        "/USUARIOSK/enbc/SIC/COMERCIA/2023-10/balcttos1001.txr",
    ] {
        touch(dir.path(), rel);
    }
    dir
}

fn month(s: &str) -> YearMonth { YearMonth::parse(s).unwrap() }

fn names(files: &[AsicFile]) -> Vec<&str> { files.iter().map(|f| f.remote_name()).collect() }

#[test]
fn location_query_expands_template() {
    let t = Template::parse("/USUARIOSK/{location_agent}/SIC/COMERCIA/{location_year:04}-{location_month:02}/");
    let q = LocationQuery { month: month("2023-05"), location_template: &t, extension: None, agent: Some("enbc".into()) };
    assert_eq!(q.expand().unwrap(), "/USUARIOSK/enbc/SIC/COMERCIA/2023-05/");
    let q = LocationQuery { agent: None, ..q };
    assert!(matches!(q.expand(), Err(AsicError::Template { .. })));
}

#[test]
fn lists_requested_kind_for_month() {
    let dir = mirror();
    let cfg = AsicConfig::builtin().unwrap();
    let mut cat = RemoteCatalog::new(ReconnectingSession::new(MirrorConnector::new(dir.path())));
    let req = ListRequest { months: vec![month("2023-10")], kinds: vec![KindId::new("adem")], ..Default::default() };
    let files = cat.list_supported_files(&cfg, &req).unwrap();
    assert_eq!(names(&files), vec!["adem1001.tx2", "adem1031.tx2", "adem1031.txf"]);
    assert!(files.iter().all(|f| f.kind.as_str() == "adem" && f.metadata.agent.is_none()));
}

#[test]
fn agent_locations_are_skipped_without_agent() {
    let dir = mirror();
    let cfg = AsicConfig::builtin().unwrap();
    let mut cat = RemoteCatalog::new(ReconnectingSession::new(MirrorConnector::new(dir.path())));
    let req = ListRequest { months: vec![month("2023-10")], ..Default::default() };
    let files = cat.list_supported_files(&cfg, &req).unwrap();
    assert!(files.iter().all(|f| f.metadata.agent.is_none()));
    assert!(names(&files).contains(&"trsm10.txr"));
    assert!(!names(&files).contains(&"LEEME.txt"));

    let req = ListRequest { agent: Some("ENBC".into()), ..req };
    let files = cat.list_supported_files(&cfg, &req).unwrap();
    let agents: Vec<_> = files.iter().filter_map(|f| f.metadata.agent.as_deref()).collect();
    assert_eq!(agents, vec!["enbc", "enbc"]);
}

#[test]
fn extension_and_latest_filters() {
    let dir = mirror();
    let cfg = AsicConfig::builtin().unwrap();
    let mut cat = RemoteCatalog::new(ReconnectingSession::new(MirrorConnector::new(dir.path())));
    let req = ListRequest {
        months: vec![month("2023-10")],
        kinds: vec![KindId::new("adem"), KindId::new("trsd")],
        extensions: vec!["TX2".into()],
        ..Default::default()
    };
    let files = cat.list_supported_files(&cfg, &req).unwrap();
    assert_eq!(names(&files), vec!["adem1001.tx2", "adem1031.tx2", "trsd1002.tx2"]);

    let req = ListRequest { extensions: vec![], latest: true, ..req };
    let files = cat.list_supported_files(&cfg, &req).unwrap();
    assert_eq!(names(&files), vec!["adem1001.tx2", "adem1031.txf", "trsd1002.tx2"]);
}

#[test]
fn each_location_is_listed_once() {
    let dir = mirror();
    let cfg = AsicConfig::builtin().unwrap();
    let inner = MirrorConnector::new(dir.path()).connect_and_authenticate().unwrap();
    let mut cat = RemoteCatalog::new(Counting { inner, lists: 0 });
    let req = ListRequest {
        months: vec![month("2023-10")],
        kinds: vec![KindId::new("adem"), KindId::new("trsd"), KindId::new("pep")],
        extensions: vec![".tx2".into(), ".txf".into(), ".txr".into()],
        ..Default::default()
    };
    cat.list_supported_files(&cfg, &req).unwrap();
    cat.list_supported_files(&cfg, &req).unwrap();
    assert_eq!(cat.transport_mut().lists, 1);
    assert_eq!(cat.cached_locations(), vec!["/PUBLICOK/SIC/COMERCIA/2023-10/"]);
}

#[test]
fn missing_month_directory_is_empty() {
    let dir = mirror();
    let cfg = AsicConfig::builtin().unwrap();
    let mut cat = RemoteCatalog::new(ReconnectingSession::new(MirrorConnector::new(dir.path())));
    let req = ListRequest { months: vec![month("2023-09"), month("2023-10")], kinds: vec![KindId::new("trsd")], ..Default::default() };
    let files = cat.list_supported_files(&cfg, &req).unwrap();
    assert_eq!(names(&files), vec!["trsd1002.tx2"]);
}

#[test]
fn bad_request_inputs() {
    let dir = mirror();
    let cfg = AsicConfig::builtin().unwrap();
    let mut cat = RemoteCatalog::new(ReconnectingSession::new(MirrorConnector::new(dir.path())));
    let unknown = ListRequest { months: vec![month("2023-10")], kinds: vec![KindId::new("nope")], ..Default::default() };
    assert!(matches!(cat.list_supported_files(&cfg, &unknown), Err(AsicError::UnknownKind { .. })));
    let bad_ext = ListRequest { months: vec![month("2023-10")], extensions: vec!["csv".into()], ..Default::default() };
    assert!(matches!(cat.list_supported_files(&cfg, &bad_ext), Err(AsicError::InvalidInput { .. })));
}

#[test]
fn unsupported_extension_aborts_listing() {
    let dir = mirror();
    touch(dir.path(), "/PUBLICOK/SIC/COMERCIA/2023-10/adem1002.tq9");
    let cfg = AsicConfig::builtin().unwrap();
    let mut cat = RemoteCatalog::new(ReconnectingSession::new(MirrorConnector::new(dir.path())));
    let req = ListRequest { months: vec![month("2023-10")], kinds: vec![KindId::new("adem")], ..Default::default() };
    let err = cat.list_supported_files(&cfg, &req).unwrap_err();
    assert!(err.is_config_fault());
}

#[test]
fn conflicting_file_only_empties_its_combination() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "/PUBLICOK/SIC/COMERCIA/2023-09/trsd0901.tx2");
    touch(dir.path(), "/PUBLICOK/SIC/COMERCIA/2023-10/trsd1001.tx2");
    // name month 09 inside the 2023-10 directory
    touch(dir.path(), "/PUBLICOK/SIC/COMERCIA/2023-10/adem0930.tx2");
    let cfg = AsicConfig::builtin().unwrap();
    let mut cat = RemoteCatalog::new(ReconnectingSession::new(MirrorConnector::new(dir.path())));
    let req = ListRequest { months: vec![month("2023-09"), month("2023-10")], ..Default::default() };
    let files = cat.list_supported_files(&cfg, &req).unwrap();
    assert_eq!(names(&files), vec!["trsd0901.tx2"]);

    let req = ListRequest { kinds: vec![KindId::new("trsd")], ..req };
    let files = cat.list_supported_files(&cfg, &req).unwrap();
    assert_eq!(names(&files), vec!["trsd0901.tx2", "trsd1001.tx2"]);
}
