use vault_core::{export_csv, import_csv, CsvError, Record};

fn record(pairs: &[(&str, &str)]) -> Record {
    pairs.iter().copied().collect()
}

#[test]
fn import_assigns_ids() {
    let import = import_csv(b"issuer_name,isin\nFoo,IN001\n").expect("import");
    assert_eq!(import.count, 1);
    let record = &import.records[0];
    assert_eq!(record.get("issuer_name"), Some("Foo"));
    assert_eq!(record.get("isin"), Some("IN001"));
    assert!(record.id().is_some());
}

#[test]
fn import_trims_headers_and_cells() {
    let import = import_csv(b" issuer_name , isin \n  Foo  ,  IN001 \n").expect("import");
    let record = &import.records[0];
    let keys: Vec<&str> = record.keys().collect();
    assert_eq!(&keys[..2], &["issuer_name", "isin"]);
    assert_eq!(record.get("issuer_name"), Some("Foo"));
    assert_eq!(record.get("isin"), Some("IN001"));
}

#[test]
fn import_keeps_existing_id_and_drops_blank_headers() {
    let import = import_csv(b"id,,isin\nB-7,ignored,IN009\n,x,IN010\n").expect("import");
    assert_eq!(import.count, 2);
    assert_eq!(import.records[0].id(), Some("B-7"));
    assert_eq!(import.records[0].len(), 2);
    assert!(import.records[1].id().is_some());
    assert_ne!(import.records[1].id(), Some(""));
}

#[test]
fn ragged_rows_fail_the_whole_import() {
    let err = import_csv(b"issuer_name,isin\nFoo,IN001\nBar\n").expect_err("ragged");
    assert!(matches!(err, CsvError::Import(_)));
}

#[test]
fn invalid_utf8_fails() {
    let err = import_csv(b"issuer_name\n\xff\xfe\n").expect_err("encoding");
    assert!(matches!(err, CsvError::Import(_)));
}

#[test]
fn empty_input_fails() {
    assert!(matches!(import_csv(b""), Err(CsvError::Import(_))));
}

#[test]
fn header_only_imports_nothing() {
    let import = import_csv(b"issuer_name,isin\n").expect("import");
    assert_eq!(import.count, 0);
}

#[test]
fn bom_is_ignored() {
    let import = import_csv(b"\xEF\xBB\xBFissuer_name\nFoo\n").expect("import");
    assert_eq!(import.records[0].get("issuer_name"), Some("Foo"));
}

#[test]
fn export_of_nothing_fails() {
    assert!(matches!(export_csv(&[]), Err(CsvError::EmptyExport)));
}

#[test]
fn export_uses_first_record_columns() {
    let records = vec![
        record(&[("id", "1"), ("issuer_name", "Alpha")]),
        record(&[("id", "2"), ("isin", "IN002"), ("extra", "dropped")]),
    ];
    let text = export_csv(&records).expect("export");
    assert_eq!(text, "id,issuer_name\n1,Alpha\n2,\n");
}

#[test]
fn export_quotes_when_needed() {
    let records = vec![record(&[("id", "1"), ("issuer_name", "Alpha, Inc.")])];
    let text = export_csv(&records).expect("export");
    assert_eq!(text, "id,issuer_name\n1,\"Alpha, Inc.\"\n");
}

#[test]
fn export_then_import_preserves_values() {
    let records = vec![
        record(&[("id", "1"), ("issuer_name", "Alpha, Inc."), ("isin", "IN001")]),
        record(&[("id", "2"), ("issuer_name", "Beta \"B\" Corp"), ("isin", "IN002")]),
    ];
    let text = export_csv(&records).expect("export");
    let import = import_csv(text.as_bytes()).expect("import");
    assert_eq!(import.records, records);
}

#[test]
fn edge_whitespace_is_exported_but_trimmed_on_import() {
    let records = vec![record(&[("id", "1"), ("issuer_name", " Alpha ")])];
    let text = export_csv(&records).expect("export");
    assert_eq!(text, "id,issuer_name\n1, Alpha \n");
    let import = import_csv(text.as_bytes()).expect("import");
    assert_eq!(import.records[0].get("issuer_name"), Some("Alpha"));
}
