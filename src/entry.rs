use crate::error::Error;
use crate::markers::MarkerRef;

/// The number of payload bytes in every entry. This is the size of the
/// largest non-fragment payload (`f64`), and also the number of string
/// bytes carried by one `DynamicStringFragment` entry.
pub const PAYLOAD_SIZE: usize = 8;

/// The encoded size of one entry: one tag byte plus the payload.
pub const ENTRY_SIZE: usize = 1 + PAYLOAD_SIZE;

/// Conversion between a typed entry payload and its raw payload bytes.
trait EntryPayload: Sized {
    fn to_payload(self) -> [u8; PAYLOAD_SIZE];
    fn from_payload(payload: [u8; PAYLOAD_SIZE]) -> Self;
}

impl EntryPayload for i32 {
    fn to_payload(self) -> [u8; PAYLOAD_SIZE] {
        i64::from(self).to_le_bytes()
    }

    fn from_payload(payload: [u8; PAYLOAD_SIZE]) -> Self {
        i64::from_le_bytes(payload) as i32
    }
}

impl EntryPayload for i64 {
    fn to_payload(self) -> [u8; PAYLOAD_SIZE] {
        self.to_le_bytes()
    }

    fn from_payload(payload: [u8; PAYLOAD_SIZE]) -> Self {
        i64::from_le_bytes(payload)
    }
}

impl EntryPayload for u64 {
    fn to_payload(self) -> [u8; PAYLOAD_SIZE] {
        self.to_le_bytes()
    }

    fn from_payload(payload: [u8; PAYLOAD_SIZE]) -> Self {
        u64::from_le_bytes(payload)
    }
}

impl EntryPayload for f64 {
    fn to_payload(self) -> [u8; PAYLOAD_SIZE] {
        self.to_le_bytes()
    }

    fn from_payload(payload: [u8; PAYLOAD_SIZE]) -> Self {
        f64::from_le_bytes(payload)
    }
}

impl EntryPayload for MarkerRef {
    fn to_payload(self) -> [u8; PAYLOAD_SIZE] {
        self.0.to_le_bytes()
    }

    fn from_payload(payload: [u8; PAYLOAD_SIZE]) -> Self {
        MarkerRef(u64::from_le_bytes(payload))
    }
}

impl EntryPayload for [u8; PAYLOAD_SIZE] {
    fn to_payload(self) -> [u8; PAYLOAD_SIZE] {
        self
    }

    fn from_payload(payload: [u8; PAYLOAD_SIZE]) -> Self {
        payload
    }
}

macro_rules! define_profile_buffer_entries {
    ($($(#[$doc:meta])* $kind:ident = $tag:literal => $payload:ty,)*) => {
        /// The discriminant of a [`ProfileBufferEntry`]. The numeric value is
        /// the tag byte in the encoded entry. Tag 0 is reserved as invalid.
        #[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum EntryKind {
            $($kind = $tag,)*
        }

        impl EntryKind {
            /// All valid kinds, in tag order.
            pub const ALL: &'static [EntryKind] = &[$(EntryKind::$kind,)*];

            pub fn from_tag(tag: u8) -> Option<Self> {
                match tag {
                    $($tag => Some(EntryKind::$kind),)*
                    _ => None,
                }
            }

            pub fn tag(self) -> u8 {
                self as u8
            }
        }

        /// One fixed-size record of the profiler buffer.
        ///
        /// The payload type of each variant is fixed by its kind. Entries
        /// encode to exactly [`ENTRY_SIZE`] bytes, whatever the kind.
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub enum ProfileBufferEntry {
            $($(#[$doc])* $kind($payload),)*
        }

        impl ProfileBufferEntry {
            pub fn kind(&self) -> EntryKind {
                match self {
                    $(ProfileBufferEntry::$kind(_) => EntryKind::$kind,)*
                }
            }

            fn payload(&self) -> [u8; PAYLOAD_SIZE] {
                match *self {
                    $(ProfileBufferEntry::$kind(value) => EntryPayload::to_payload(value),)*
                }
            }

            fn from_kind_and_payload(kind: EntryKind, payload: [u8; PAYLOAD_SIZE]) -> Self {
                match kind {
                    $(EntryKind::$kind => {
                        ProfileBufferEntry::$kind(<$payload as EntryPayload>::from_payload(payload))
                    })*
                }
            }
        }
    };
}

define_profile_buffer_entries! {
    CategoryPair = 1 => i32,
    CollectionStart = 2 => f64,
    CollectionEnd = 3 => f64,
    /// The byte length of a label. The label text follows in
    /// `DynamicStringFragment` entries.
    Label = 4 => u64,
    FrameFlags = 5 => u64,
    DynamicStringFragment = 6 => [u8; PAYLOAD_SIZE],
    JitReturnAddr = 7 => u64,
    LineNumber = 8 => i32,
    ColumnNumber = 9 => i32,
    NativeLeafAddr = 10 => u64,
    Marker = 11 => MarkerRef,
    Pause = 12 => f64,
    Responsiveness = 13 => f64,
    Resume = 14 => f64,
    ThreadId = 15 => i32,
    Time = 16 => f64,
    ResidentMemory = 17 => f64,
    UnsharedMemory = 18 => u64,
    /// An opaque, pointer-sized counter identifier.
    CounterId = 19 => u64,
    CounterKey = 20 => u64,
    Number = 21 => u64,
    Count = 22 => i64,
    ProfilerOverheadTime = 23 => f64,
    ProfilerOverheadDuration = 24 => f64,
}

impl ProfileBufferEntry {
    pub fn is_kind(&self, kind: EntryKind) -> bool {
        self.kind() == kind
    }

    /// The payload of an `int` entry. Panics for any other kind.
    pub fn get_int(&self) -> i32 {
        match *self {
            ProfileBufferEntry::CategoryPair(v)
            | ProfileBufferEntry::LineNumber(v)
            | ProfileBufferEntry::ColumnNumber(v)
            | ProfileBufferEntry::ThreadId(v) => v,
            _ => panic!("get_int called on a {:?} entry", self.kind()),
        }
    }

    /// The payload of a floating point entry. Panics for any other kind.
    pub fn get_double(&self) -> f64 {
        match *self {
            ProfileBufferEntry::CollectionStart(v)
            | ProfileBufferEntry::CollectionEnd(v)
            | ProfileBufferEntry::Pause(v)
            | ProfileBufferEntry::Responsiveness(v)
            | ProfileBufferEntry::Resume(v)
            | ProfileBufferEntry::Time(v)
            | ProfileBufferEntry::ResidentMemory(v)
            | ProfileBufferEntry::ProfilerOverheadTime(v)
            | ProfileBufferEntry::ProfilerOverheadDuration(v) => v,
            _ => panic!("get_double called on a {:?} entry", self.kind()),
        }
    }

    pub fn get_int64(&self) -> i64 {
        match *self {
            ProfileBufferEntry::Count(v) => v,
            _ => panic!("get_int64 called on a {:?} entry", self.kind()),
        }
    }

    pub fn get_uint64(&self) -> u64 {
        match *self {
            ProfileBufferEntry::Label(v)
            | ProfileBufferEntry::FrameFlags(v)
            | ProfileBufferEntry::UnsharedMemory(v)
            | ProfileBufferEntry::CounterKey(v)
            | ProfileBufferEntry::Number(v) => v,
            _ => panic!("get_uint64 called on a {:?} entry", self.kind()),
        }
    }

    /// The payload of an address-like entry (code addresses and counter ids).
    pub fn get_address(&self) -> u64 {
        match *self {
            ProfileBufferEntry::JitReturnAddr(v)
            | ProfileBufferEntry::NativeLeafAddr(v)
            | ProfileBufferEntry::CounterId(v) => v,
            _ => panic!("get_address called on a {:?} entry", self.kind()),
        }
    }

    pub fn get_marker(&self) -> MarkerRef {
        match *self {
            ProfileBufferEntry::Marker(marker) => marker,
            _ => panic!("get_marker called on a {:?} entry", self.kind()),
        }
    }

    pub fn get_chars(&self) -> [u8; PAYLOAD_SIZE] {
        match *self {
            ProfileBufferEntry::DynamicStringFragment(chars) => chars,
            _ => panic!("get_chars called on a {:?} entry", self.kind()),
        }
    }

    /// Packed layout: 1 byte for the tag + 8 little-endian bytes for the value.
    pub fn to_bytes(&self) -> [u8; ENTRY_SIZE] {
        let mut bytes = [0u8; ENTRY_SIZE];
        bytes[0] = self.kind().tag();
        bytes[1..].copy_from_slice(&self.payload());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; ENTRY_SIZE]) -> Result<Self, Error> {
        let kind = EntryKind::from_tag(bytes[0]).ok_or(Error::InvalidEntryKind(bytes[0]))?;
        let mut payload = [0u8; PAYLOAD_SIZE];
        payload.copy_from_slice(&bytes[1..]);
        Ok(Self::from_kind_and_payload(kind, payload))
    }
}

/// Decode a fixed-stride sequence of encoded entries.
pub fn decode_entries(data: &[u8]) -> Result<Vec<ProfileBufferEntry>, Error> {
    if data.len() % ENTRY_SIZE != 0 {
        return Err(Error::TruncatedEntry { len: data.len() });
    }
    data.chunks_exact(ENTRY_SIZE)
        .map(|chunk| {
            let mut bytes = [0u8; ENTRY_SIZE];
            bytes.copy_from_slice(chunk);
            ProfileBufferEntry::from_bytes(&bytes)
        })
        .collect()
}

pub fn encode_entries(entries: &[ProfileBufferEntry]) -> Vec<u8> {
    let mut data = Vec::with_capacity(entries.len() * ENTRY_SIZE);
    for entry in entries {
        data.extend_from_slice(&entry.to_bytes());
    }
    data
}
