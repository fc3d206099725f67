use std::fs;
use std::io::BufWriter;
use std::sync::Arc;
use std::thread;

use flight_log::category::{CTUN, GPS, NTUN};
use flight_log::plane::{
    plane_catalogue, ArmDisarm, ControlTuning, NavTuning, PlaneMessage, Startup, StrainData1,
};
use flight_log::{
    Catalogue, CategoryMask, FieldValue, Logger, ManualClock, MemoryLog, Replay, ReplayEvent,
    StreamWriter, TimeSource,
};

fn ctun(time_us: u64) -> ControlTuning {
    ControlTuning {
        time_us,
        nav_roll_cd: 1500,
        roll_cd: 1480,
        nav_pitch_cd: -200,
        pitch_cd: -210,
        throttle_out: 40,
        rudder_out: 2,
        throttle_dem: 45,
    }
}

fn ntun(time_us: u64) -> NavTuning {
    NavTuning {
        time_us,
        yaw_cd: 18_000,
        wp_distance: 120.5,
        target_bearing_cd: 4500,
        nav_bearing_cd: 4400,
        altitude_error_cm: 30,
        airspeed_cm: 1600,
        altitude: 80.25,
        groundspeed_cm: 1550,
        xtrack_error: -0.75,
    }
}

fn messages(data: &[u8]) -> Vec<PlaneMessage> {
    let catalogue = plane_catalogue().unwrap();
    Replay::new(catalogue, data)
        .filter_map(|event| PlaneMessage::from_event(&event))
        .filter(|message| !matches!(message, PlaneMessage::Format(_)))
        .collect()
}

#[test]
fn test_optional_records_follow_the_mask() {
    let catalogue = plane_catalogue().unwrap();
    let log = MemoryLog::new();
    let mask = Arc::new(CategoryMask::plane(CTUN.mask()));
    let mut logger = Logger::new(catalogue, mask.clone(), log.clone());

    assert!(logger.write_message(&ctun(1)).unwrap());
    assert!(!logger.write_message(&ntun(1)).unwrap());
    mask.enable("ntun").unwrap();
    mask.disable("ctun").unwrap();
    assert!(!logger.write_message(&ctun(2)).unwrap());
    assert!(logger.write_message(&ntun(2)).unwrap());

    assert_eq!(
        messages(&log.snapshot()),
        [
            PlaneMessage::ControlTuning(ctun(1)),
            PlaneMessage::NavTuning(ntun(2)),
        ]
    );
    let stats = logger.stats();
    assert_eq!((stats.written, stats.suppressed), (2, 2));
}

#[test]
fn test_mandatory_records_ignore_the_mask() {
    let catalogue = plane_catalogue().unwrap();
    let log = MemoryLog::new();
    let mut logger = Logger::new(catalogue, Arc::new(CategoryMask::plane(0)), log.clone());

    let strt = Startup {
        time_us: 10,
        startup_type: 0,
        command_total: 4,
    };
    let arm = ArmDisarm {
        time_us: 20,
        arm_state: 1,
        arm_checks: 0x3fff,
    };
    assert!(logger.write_message(&strt).unwrap());
    assert!(logger.write_message(&arm).unwrap());
    assert!(!logger.write_message(&ctun(30)).unwrap());

    assert_eq!(
        messages(&log.snapshot()),
        [PlaneMessage::Startup(strt), PlaneMessage::ArmDisarm(arm)]
    );
}

#[test]
fn test_untyped_optional_write() {
    let catalogue = plane_catalogue().unwrap();
    let log = MemoryLog::new();
    let mut logger = Logger::new(catalogue, Arc::new(CategoryMask::plane(0)), log.clone());
    let values = [
        FieldValue::U32(1),
        FieldValue::U32(2),
        FieldValue::F32(0.0),
        FieldValue::F32(0.0),
        FieldValue::F32(0.0),
        FieldValue::F32(0.0),
        FieldValue::F32(0.0),
        FieldValue::F32(0.0),
        FieldValue::F32(21.5),
        FieldValue::F32(22.0),
    ];

    assert!(!logger.write_optional(&GPS, 20, &values).unwrap());
    logger.mask().enable("strain_data").unwrap();
    assert!(logger.write_optional(&flight_log::category::STRAIN_DATA, 20, &values).unwrap());

    match messages(&log.snapshot()).as_slice() {
        [PlaneMessage::StrainData1(StrainData1 { temp_left, .. })] => {
            assert_eq!(*temp_left, 21.5)
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_log_describes_itself() {
    let catalogue = plane_catalogue().unwrap();
    let log = MemoryLog::new();
    let mut logger = Logger::new(catalogue, Arc::new(CategoryMask::plane(u32::MAX)), log.clone());
    assert!(logger.start_new_log().unwrap());
    logger.write_message(&ctun(5)).unwrap();

    let bytes = log.snapshot();
    let recovered = Catalogue::from_log(&bytes).unwrap();
    assert_eq!(&recovered, catalogue);

    // Decoding with the recovered catalogue gives the same records.
    let names: Vec<String> = Replay::new(&recovered, &bytes)
        .filter_map(|event| match event {
            ReplayEvent::Decoded(record) => Some(record.name().to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(names.len(), catalogue.len() + 1);
    assert!(names[..catalogue.len()].iter().all(|n| n == "FMT"));
    assert_eq!(names.last().map(String::as_str), Some("CTUN"));
}

#[test]
fn test_reader_sees_whole_records_while_writing() {
    let catalogue = plane_catalogue().unwrap();
    let log = MemoryLog::new();
    let mask = Arc::new(CategoryMask::plane(CTUN.mask() | NTUN.mask()));

    let writer_log = log.clone();
    let writer = thread::spawn(move || {
        let clock = ManualClock::starting_at(0);
        let mut logger = Logger::new(catalogue, mask, writer_log);
        logger.start_new_log().unwrap();
        for _ in 0..500 {
            let t = clock.advance(20_000);
            logger.write_message(&ctun(t)).unwrap();
            logger.write_message(&ntun(t)).unwrap();
        }
    });

    let mut last_len = 0;
    while !writer.is_finished() {
        let bytes = log.snapshot();
        assert!(bytes.len() >= last_len);
        last_len = bytes.len();
        for event in Replay::new(catalogue, &bytes) {
            assert!(
                matches!(event, ReplayEvent::Decoded(_) | ReplayEvent::EndOfStream),
                "{event:?}"
            );
        }
    }
    writer.join().unwrap();

    let all = messages(&log.snapshot());
    assert_eq!(all.len(), 1000);
    assert_eq!(all[999], PlaneMessage::NavTuning(ntun(500 * 20_000)));
}

#[test]
fn test_stream_writer_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flight.bin");
    let catalogue = plane_catalogue().unwrap();

    {
        let file = fs::File::create(&path).unwrap();
        let mut logger = Logger::new(
            catalogue,
            Arc::new(CategoryMask::plane(CTUN.mask())),
            StreamWriter::new(BufWriter::new(file)),
        );
        logger.start_new_log().unwrap();
        for t in 0..10 {
            logger.write_message(&ctun(t)).unwrap();
        }
        // Dropping the logger flushes the buffered writer.
    }

    let bytes = fs::read(&path).unwrap();
    let recovered = Catalogue::from_log(&bytes).unwrap();
    let times: Vec<u64> = Replay::new(&recovered, &bytes)
        .filter_map(|event| match event {
            ReplayEvent::Decoded(record) if record.name() == "CTUN" => {
                match record.get("TimeUS") {
                    Some(FieldValue::U64(t)) => Some(*t),
                    _ => None,
                }
            }
            _ => None,
        })
        .collect();
    assert_eq!(times, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_manual_clock_is_a_time_source() {
    let clock = ManualClock::starting_at(5);
    let source: &dyn TimeSource = &clock;
    assert_eq!(source.micros64(), 5);
}
