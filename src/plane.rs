//! Built-in ArduPlane message set.
//!
//! Every message is declared once through [`log_message!`](crate::log_message);
//! the struct, the catalogue row and the length check all come from that one
//! declaration. Messages with `category: None` are always written.

use lazy_static::lazy_static;

use crate::catalogue::Catalogue;
use crate::category;
use crate::decoder::{Record, ReplayEvent};
use crate::error::SchemaError;
use crate::message::Message;
use crate::schema::SchemaEntry;

crate::log_message! {
    /// Format record: describes one other message type.
    Format {
        id: 128,
        name: "FMT",
        codes: "BBnNZ",
        labels: "Type,Length,Name,Format,Columns",
        length: 89,
        category: None,
        fields {
            msg_type: u8,
            length: u8,
            name: String,
            format: String,
            columns: String,
        }
    }
}

crate::log_message! {
    /// Attitude controller demands and achieved angles, in centidegrees.
    ControlTuning {
        id: 1,
        name: "CTUN",
        codes: "Qcccchhh",
        labels: "TimeUS,NavRoll,Roll,NavPitch,Pitch,ThrOut,RdrOut,ThrDem",
        length: 25,
        category: Some(category::CTUN),
        fields {
            time_us: u64,
            nav_roll_cd: i16,
            roll_cd: i16,
            nav_pitch_cd: i16,
            pitch_cd: i16,
            throttle_out: i16,
            rudder_out: i16,
            throttle_dem: i16,
        }
    }
}

crate::log_message! {
    /// Navigation state toward the active waypoint.
    NavTuning {
        id: 2,
        name: "NTUN",
        codes: "QCfccccfIf",
        labels: "TimeUS,Yaw,WpDist,TargBrg,NavBrg,AltErr,Arspd,Alt,GSpdCM,XT",
        length: 39,
        category: Some(category::NTUN),
        fields {
            time_us: u64,
            yaw_cd: u32,
            wp_distance: f32,
            target_bearing_cd: i16,
            nav_bearing_cd: i16,
            altitude_error_cm: i16,
            airspeed_cm: i16,
            altitude: f32,
            groundspeed_cm: u32,
            xtrack_error: f32,
        }
    }
}

crate::log_message! {
    /// Main loop timing and sensor error counters.
    Performance {
        id: 3,
        name: "PM",
        codes: "QIHIhhhBH",
        labels: "TimeUS,LTime,MLC,gDt,GDx,GDy,GDz,I2CErr,INSErr",
        length: 30,
        category: Some(category::PM),
        fields {
            time_us: u64,
            loop_time: u32,
            main_loop_count: u16,
            g_dt_max: u32,
            gyro_drift_x: i16,
            gyro_drift_y: i16,
            gyro_drift_z: i16,
            i2c_lockup_count: u8,
            ins_error_count: u16,
        }
    }
}

crate::log_message! {
    /// Written once per boot.
    Startup {
        id: 4,
        name: "STRT",
        codes: "QBH",
        labels: "TimeUS,SType,CTot",
        length: 14,
        category: None,
        fields {
            time_us: u64,
            startup_type: u8,
            command_total: u16,
        }
    }
}

crate::log_message! {
    /// Rangefinder reading next to the barometric altitude.
    Sonar {
        id: 9,
        name: "SONR",
        codes: "QHfffbBf",
        labels: "TimeUS,DistCM,Volt,BaroAlt,GSpd,Thr,Cnt,Corr",
        length: 31,
        category: Some(category::SONAR),
        fields {
            time_us: u64,
            distance_cm: u16,
            voltage: f32,
            baro_alt: f32,
            groundspeed: f32,
            throttle: i8,
            count: u8,
            correction: f32,
        }
    }
}

crate::log_message! {
    /// Arming state transition.
    ArmDisarm {
        id: 10,
        name: "ARM",
        codes: "QBH",
        labels: "TimeUS,ArmState,ArmChecks",
        length: 14,
        category: None,
        fields {
            time_us: u64,
            arm_state: u8,
            arm_checks: u16,
        }
    }
}

crate::log_message! {
    /// Flight status flags.
    Status {
        id: 11,
        name: "STAT",
        codes: "QBfBBBBBB",
        labels: "TimeUS,isFlying,isFlyProb,Armed,Safety,Crash,Still,Stage,Hit",
        length: 22,
        category: Some(category::ATTITUDE_MED),
        fields {
            time_us: u64,
            is_flying: u8,
            is_flying_probability: f32,
            armed: u8,
            safety: u8,
            is_crashed: u8,
            is_still: u8,
            stage: u8,
            impact: u8,
        }
    }
}

crate::log_message! {
    /// Optical flow sensor sample.
    OpticalFlow {
        id: 12,
        name: "OF",
        codes: "QBffff",
        labels: "TimeUS,Qual,flowX,flowY,bodyX,bodyY",
        length: 28,
        category: Some(category::IMU),
        fields {
            time_us: u64,
            surface_quality: u8,
            flow_x: f32,
            flow_y: f32,
            body_x: f32,
            body_y: f32,
        }
    }
}

crate::log_message! {
    /// Autotune rate controller step.
    AutotuneRatio {
        id: 15,
        name: "ATRP",
        codes: "QBBcfff",
        labels: "TimeUS,Type,State,Servo,Demanded,Achieved,P",
        length: 27,
        category: None,
        fields {
            time_us: u64,
            kind: u8,
            state: u8,
            servo_cd: i16,
            demanded: f32,
            achieved: f32,
            p: f32,
        }
    }
}

crate::log_message! {
    /// Outer wing strain gauges and wing-tip temperatures.
    StrainData1 {
        id: 20,
        name: "STN1",
        codes: "IIffffffff",
        labels: "PxmS,McmS,L5,L3,L1,R1,R3,R5,TL,TR",
        length: 43,
        category: Some(category::STRAIN_DATA),
        fields {
            px4_time_ms: u32,
            mcu_time_ms: u32,
            left_5: f32,
            left_3: f32,
            left_1: f32,
            right_1: f32,
            right_3: f32,
            right_5: f32,
            temp_left: f32,
            temp_right: f32,
        }
    }
}

crate::log_message! {
    /// Inner wing strain gauges.
    StrainData2 {
        id: 21,
        name: "STN2",
        codes: "IIffffff",
        labels: "PxmS,McmS,L6,L4,L2,R2,R4,R6",
        length: 35,
        category: Some(category::STRAIN_DATA),
        fields {
            px4_time_ms: u32,
            mcu_time_ms: u32,
            left_6: f32,
            left_4: f32,
            left_2: f32,
            right_2: f32,
            right_4: f32,
            right_6: f32,
        }
    }
}

impl Format {
    /// The format record describing `entry`.
    pub fn describing(entry: &SchemaEntry) -> Self {
        Self {
            msg_type: entry.message_id(),
            length: u8::try_from(entry.byte_length()).unwrap_or(u8::MAX),
            name: entry.name().to_string(),
            format: entry.codes_string(),
            columns: entry.labels_string(),
        }
    }

    /// Back to a schema entry. Runs the usual validation.
    pub fn to_entry(&self) -> Result<SchemaEntry, SchemaError> {
        SchemaEntry::new(
            self.msg_type,
            u16::from(self.length),
            &self.name,
            &self.format,
            &self.columns,
        )
    }
}

macro_rules! plane_messages {
    ($($variant:ident),* $(,)?) => {
        /// Any built-in message, or the raw bytes of one we could not type.
        #[derive(Debug, Clone, PartialEq)]
        pub enum PlaneMessage {
            $( $variant($variant), )*
            Unknown { id: u8, raw: Vec<u8> },
        }

        impl PlaneMessage {
            pub fn message_id(&self) -> u8 {
                match self {
                    $( PlaneMessage::$variant(_) => <$variant as Message>::ID, )*
                    PlaneMessage::Unknown { id, .. } => *id,
                }
            }

            /// Types a decoded record. Records that do not match a built-in
            /// shape keep their payload bytes.
            pub fn from_record(record: &Record<'_>) -> Self {
                $(
                    if record.message_id() == <$variant as Message>::ID {
                        if let Some(message) = <$variant as Message>::from_record(record) {
                            return PlaneMessage::$variant(message);
                        }
                    }
                )*
                PlaneMessage::Unknown {
                    id: record.message_id(),
                    raw: record.payload().to_vec(),
                }
            }
        }

        /// Schema rows of every built-in message, format record first.
        pub fn plane_entries() -> Result<Vec<SchemaEntry>, SchemaError> {
            Ok(vec![ $( <$variant as Message>::schema()?, )* ])
        }
    };
}

plane_messages! {
    Format,
    Performance,
    Startup,
    ControlTuning,
    NavTuning,
    Sonar,
    ArmDisarm,
    AutotuneRatio,
    Status,
    StrainData1,
    StrainData2,
    OpticalFlow,
}

impl PlaneMessage {
    /// Types a replay event. Truncation and end of stream carry no message.
    pub fn from_event(event: &ReplayEvent<'_>) -> Option<Self> {
        match event {
            ReplayEvent::Decoded(record) => Some(Self::from_record(record)),
            ReplayEvent::UnknownMessage { id, raw, .. } => Some(PlaneMessage::Unknown {
                id: *id,
                raw: raw.to_vec(),
            }),
            _ => None,
        }
    }
}

lazy_static! {
    static ref PLANE_CATALOGUE: Result<Catalogue, SchemaError> =
        plane_entries().and_then(Catalogue::build);
}

/// The validated built-in catalogue, built on first use.
pub fn plane_catalogue() -> Result<&'static Catalogue, SchemaError> {
    PLANE_CATALOGUE.as_ref().map_err(SchemaError::clone)
}
