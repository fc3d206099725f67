use flight_log::catalogue::format_entry;
use flight_log::plane::{plane_catalogue, plane_entries};
use flight_log::{encode, Catalogue, FieldValue, SchemaEntry, SchemaError};

fn entry(id: u8, name: &str, codes: &str, labels: &str) -> SchemaEntry {
    SchemaEntry::with_computed_length(id, name, codes, labels).unwrap()
}

#[test]
fn test_duplicate_message_id_rejected() {
    let err = Catalogue::build([
        entry(3, "PM", "QI", "TimeUS,LTime"),
        entry(3, "XX", "B", "V"),
    ])
    .unwrap_err();
    assert_eq!(
        err,
        SchemaError::DuplicateMessageId {
            id: 3,
            first: "PM".into(),
            second: "XX".into()
        }
    );
}

#[test]
fn test_size_mismatch_rejected() {
    let att = SchemaEntry::new(1, 20, "ATT", "Qff", "TimeUS,Roll,Pitch").unwrap();
    assert_eq!(
        Catalogue::build([att]).unwrap_err(),
        SchemaError::SizeMismatch {
            id: 1,
            name: "ATT".into(),
            declared: 20,
            computed: 19
        }
    );
}

#[test]
fn test_eleven_codes_ten_labels_rejected() {
    let stn1 = SchemaEntry::new(
        20,
        47,
        "STN1",
        "QIIffffffff",
        "PxmS,McmS,L5,L3,L1,R1,R3,R5,TL,TR",
    )
    .unwrap();
    assert_eq!(
        Catalogue::build([stn1]).unwrap_err(),
        SchemaError::FieldCountMismatch {
            id: 20,
            name: "STN1".into(),
            codes: 11,
            names: 10
        }
    );
}

#[test]
fn test_unknown_type_code() {
    let err = SchemaEntry::new(5, 4, "BAD", "X", "V").unwrap_err();
    assert_eq!(
        err,
        SchemaError::UnknownTypeCode {
            name: "BAD".into(),
            code: 'X'
        }
    );
}

#[test]
fn test_format_limits_enforced() {
    let err = Catalogue::build([entry(5, "LONGER", "B", "V")]).unwrap_err();
    assert!(matches!(
        err,
        SchemaError::FormatFieldTooLong {
            what: "name",
            len: 6,
            max: 4,
            ..
        }
    ));

    let err = Catalogue::build([entry(5, "DUP", "BB", "A,A")]).unwrap_err();
    assert_eq!(
        err,
        SchemaError::DuplicateFieldName {
            name: "DUP".into(),
            field: "A".into()
        }
    );
}

#[test]
fn test_one_bad_entry_builds_nothing() {
    let mut entries = plane_entries().unwrap();
    entries.push(SchemaEntry::new(99, 5, "OOPS", "B", "V").unwrap());
    assert!(Catalogue::build(entries).is_err());
}

#[test]
fn test_plane_lookup() {
    let catalogue = plane_catalogue().unwrap();
    let ntun = catalogue.lookup(2).unwrap();
    assert_eq!(ntun.name(), "NTUN");
    assert_eq!(ntun.codes_string(), "QCfccccfIf");
    assert_eq!(ntun.field_count(), 10);
    assert!(catalogue.lookup(200).is_none());

    let ids: Vec<u8> = catalogue.list().map(SchemaEntry::message_id).collect();
    assert_eq!(ids[0], 128);
    assert_eq!(ids.len(), catalogue.len());
}

fn format_record(cat: &Catalogue, described: &SchemaEntry) -> Vec<u8> {
    encode(cat, 128, &Catalogue::format_values(described)).unwrap()
}

#[test]
fn test_recover_catalogue_from_log() {
    let plane = plane_catalogue().unwrap();
    let mut log = vec![0x00, 0x42];
    for entry in plane.list() {
        log.extend(format_record(plane, entry));
    }
    log.extend(
        encode(
            plane,
            4,
            &[FieldValue::U64(9), FieldValue::U8(1), FieldValue::U16(2)],
        )
        .unwrap(),
    );

    let recovered = Catalogue::from_log(&log).unwrap();
    assert_eq!(&recovered, plane);
}

#[test]
fn test_recover_from_log_without_formats() {
    let recovered = Catalogue::from_log(&[1, 2, 3, 0xA3]).unwrap();
    assert_eq!(recovered.len(), 1);
    assert_eq!(recovered.lookup(128), Some(&format_entry()));
}

#[test]
fn test_recover_rejects_conflicting_formats() {
    let cat = Catalogue::build([format_entry()]).unwrap();
    let mut log = format_record(&cat, &entry(7, "AAA", "B", "V"));
    log.extend(format_record(&cat, &entry(7, "BBB", "H", "V")));
    assert!(matches!(
        Catalogue::from_log(&log),
        Err(SchemaError::DuplicateMessageId { id: 7, .. })
    ));
}
