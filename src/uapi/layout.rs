//! Field tables for every v1 record.

use crate::codec::{Field, FieldKind, Layout, Scalar};

use super::{GPIOHANDLES_MAX, GPIO_MAX_NAME_SIZE};

const U32: FieldKind = FieldKind::Scalar(Scalar::U32);
const I32: FieldKind = FieldKind::Scalar(Scalar::I32);
const U64: FieldKind = FieldKind::Scalar(Scalar::U64);
const NAME: FieldKind = FieldKind::Str {
    capacity: GPIO_MAX_NAME_SIZE,
};
const OFFSETS: FieldKind = FieldKind::Array {
    elem: Scalar::U32,
    len: GPIOHANDLES_MAX,
};
const VALUES: FieldKind = FieldKind::Array {
    elem: Scalar::U8,
    len: GPIOHANDLES_MAX,
};

/// struct gpiochip_info
pub const CHIP_INFO: Layout = Layout {
    name: "gpiochip_info",
    fields: &[
        Field::new("name", NAME, 0),
        Field::new("label", NAME, 32),
        Field::new("lines", U32, 64),
    ],
    size: 68,
};

/// struct gpioline_info
pub const LINE_INFO: Layout = Layout {
    name: "gpioline_info",
    fields: &[
        Field::new("line_offset", U32, 0),
        Field::new("flags", U32, 4),
        Field::new("name", NAME, 8),
        Field::new("consumer", NAME, 40),
    ],
    size: 72,
};

/// struct gpioline_info_changed
pub const LINE_INFO_CHANGED: Layout = Layout {
    name: "gpioline_info_changed",
    fields: &[
        Field::new("info", FieldKind::Nested(&LINE_INFO), 0),
        Field::new("timestamp", U64, 72),
        Field::new("event_type", U32, 80),
        Field::new(
            "padding",
            FieldKind::Reserved {
                elem: Scalar::U32,
                len: 5,
            },
            84,
        ),
    ],
    size: 104,
};

/// struct gpiohandle_request
pub const HANDLE_REQUEST: Layout = Layout {
    name: "gpiohandle_request",
    fields: &[
        Field::new("lineoffsets", OFFSETS, 0),
        Field::new("flags", U32, 256),
        Field::new("default_values", VALUES, 260),
        Field::new("consumer_label", NAME, 324),
        Field::new("lines", U32, 356),
        Field::new("fd", I32, 360),
    ],
    size: 364,
};

/// struct gpiohandle_config
pub const HANDLE_CONFIG: Layout = Layout {
    name: "gpiohandle_config",
    fields: &[
        Field::new("flags", U32, 0),
        Field::new("default_values", VALUES, 4),
        Field::new(
            "padding",
            FieldKind::Reserved {
                elem: Scalar::U32,
                len: 4,
            },
            68,
        ),
    ],
    size: 84,
};

/// struct gpiohandle_data
pub const HANDLE_DATA: Layout = Layout {
    name: "gpiohandle_data",
    fields: &[Field::new("values", VALUES, 0)],
    size: 64,
};

/// struct gpioevent_request
pub const EVENT_REQUEST: Layout = Layout {
    name: "gpioevent_request",
    fields: &[
        Field::new("lineoffset", U32, 0),
        Field::new("handleflags", U32, 4),
        Field::new("eventflags", U32, 8),
        Field::new("consumer_label", NAME, 12),
        Field::new("fd", I32, 44),
    ],
    size: 48,
};

/// struct gpioevent_data, without the tail padding the C compiler adds
pub const EVENT_DATA: Layout = Layout {
    name: "gpioevent_data",
    fields: &[Field::new("timestamp", U64, 0), Field::new("id", U32, 8)],
    size: 12,
};

/// Bytes following each [`EVENT_DATA`] record in the event fd stream
pub const EVENT_FRAME_TRAILER: usize = 4;

/// Stride between consecutive events read from an event fd
pub const EVENT_FRAME_SIZE: usize = EVENT_DATA.size + EVENT_FRAME_TRAILER;

const _: () = assert!(CHIP_INFO.is_consistent());
const _: () = assert!(LINE_INFO.is_consistent());
const _: () = assert!(LINE_INFO_CHANGED.is_consistent());
const _: () = assert!(HANDLE_REQUEST.is_consistent());
const _: () = assert!(HANDLE_CONFIG.is_consistent());
const _: () = assert!(HANDLE_DATA.is_consistent());
const _: () = assert!(EVENT_REQUEST.is_consistent());
const _: () = assert!(EVENT_DATA.is_consistent());
const _: () = assert!(EVENT_FRAME_SIZE % EVENT_DATA.align() == 0);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(CHIP_INFO.size, 68);
        assert_eq!(LINE_INFO.size, 72);
        assert_eq!(LINE_INFO_CHANGED.size, 104);
        assert_eq!(HANDLE_REQUEST.size, 364);
        assert_eq!(HANDLE_CONFIG.size, 84);
        assert_eq!(HANDLE_DATA.size, 64);
        assert_eq!(EVENT_REQUEST.size, 48);
        assert_eq!(EVENT_FRAME_SIZE, 16);
    }

    #[test]
    fn output_fd_offsets() {
        assert_eq!(HANDLE_REQUEST.field("fd").map(|f| f.offset), Some(360));
        assert_eq!(EVENT_REQUEST.field("fd").map(|f| f.offset), Some(44));
    }
}
