use std::path::Path;

use assert_cmd::Command;
use pretty_assertions::assert_eq;

use altofs::{save_image, Cursor, FileEntry, Geometry, PageStore, SerialNumber, Vda, SN_DIRECTORY, VERSION_FREE};

fn write_entry(store: &mut PageStore, dir: FileEntry, leaf_vda: Vda, leaf_sn: SerialNumber, name: &str) {
    let mut payload = Vec::new();
    payload.extend_from_slice(&leaf_sn.word1.to_be_bytes());
    payload.extend_from_slice(&leaf_sn.word2.to_be_bytes());
    payload.extend_from_slice(&1u16.to_be_bytes());
    payload.extend_from_slice(&0u16.to_be_bytes());
    payload.extend_from_slice(&(leaf_vda as u16).to_be_bytes());
    payload.push(name.len() as u8);
    payload.extend_from_slice(name.as_bytes());
    if payload.len() % 2 != 0 {
        payload.push(0);
    }
    let length_words = (2 + payload.len()) / 2;
    let mut entry = Vec::new();
    entry.extend_from_slice(&(0x0400u16 | length_words as u16).to_be_bytes());
    entry.extend_from_slice(&payload);

    let dir_entry = FileEntry::from_leader(store, dir.leader_vda).unwrap();
    let mut cursor = Cursor::open(store, dir_entry, false).unwrap();
    cursor.write(store, &entry, entry.len(), true).unwrap();
}

fn build_image(path: &Path) -> Geometry {
    let geometry = Geometry::new(2, 1, 8).unwrap();
    let mut store = PageStore::new(geometry).unwrap();
    for vda in 0..store.len() as Vda {
        let rda = geometry.vda_to_rda(vda).unwrap();
        let page = store.page_mut(vda).unwrap();
        page.header = [0, rda];
        page.label.version = VERSION_FREE;
    }

    let root_sn = SerialNumber { word1: SN_DIRECTORY, word2: 1 };
    let memo_sn = SerialNumber { word1: 0, word2: 2 };

    {
        let root = store.page_mut(1).unwrap();
        root.label.version = 1;
        root.label.serial_number = root_sn;
        root.label.nbytes = 512;
        root.data[12] = 4;
        root.data[13..17].copy_from_slice(b"Root");
    }
    {
        let memo = store.page_mut(3).unwrap();
        memo.label.version = 1;
        memo.label.serial_number = memo_sn;
        memo.label.nbytes = 512;
        memo.data[12] = 8;
        memo.data[13..21].copy_from_slice(b"Memo.txt");
    }

    let root_entry = FileEntry::from_leader(&store, 1).unwrap();
    write_entry(&mut store, root_entry, 3, memo_sn, "Memo.txt");

    let memo_entry = FileEntry::from_leader(&store, 3).unwrap();
    let mut cursor = Cursor::open(&store, memo_entry, false).unwrap();
    cursor.write(&mut store, b"contents", 8, true).unwrap();

    save_image(&store, path).unwrap();
    geometry
}

#[test]
fn summary_reports_ok_integrity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.dsk");
    let geometry = build_image(&path);

    let mut cmd = Command::cargo_bin("altofs").unwrap();
    cmd.arg(&path)
        .arg("-s")
        .arg("-g")
        .arg(format!(
            "{},{},{}",
            geometry.num_cylinders, geometry.num_heads, geometry.num_sectors
        ));

    let output = cmd.assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("integrity: ok"));
    assert!(stdout.contains("Memo.txt"));
}

#[test]
fn extract_writes_host_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.dsk");
    let geometry = build_image(&path);

    let out_path = dir.path().join("out.txt");
    let mut cmd = Command::cargo_bin("altofs").unwrap();
    cmd.arg(&path)
        .arg("-g")
        .arg(format!(
            "{},{},{}",
            geometry.num_cylinders, geometry.num_heads, geometry.num_sectors
        ))
        .arg("-e")
        .arg("Memo.txt")
        .arg("-o")
        .arg(&out_path);

    cmd.assert().success();
    assert_eq!(std::fs::read(&out_path).unwrap(), b"contents");
}
