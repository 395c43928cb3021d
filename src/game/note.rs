pub const NUM_COLUMNS: usize = 4;

/// Highest value of the raw velocity scale found in datasets.
pub const RAW_VELOCITY_MAX: f32 = 127.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Column(u8);

impl Column {
    pub const ALL: [Column; NUM_COLUMNS] = [Column(0), Column(1), Column(2), Column(3)];

    pub const fn new(index: usize) -> Option<Self> {
        if index < NUM_COLUMNS {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Column is a pure function of pitch: `pitch mod 4`.
    #[inline(always)]
    pub const fn from_pitch(pitch: i32) -> Self {
        Self(pitch.rem_euclid(NUM_COLUMNS as i32) as u8)
    }

    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoteId(pub usize);

/// One row of the note dataset, parsed once and never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteRecord {
    pub user_played: bool,
    pub instrument: String,
    /// Normalized to [0, 1].
    pub velocity: f32,
    /// MIDI pitch number.
    pub pitch: i32,
    pub start: f64,
    pub end: f64,
}

impl NoteRecord {
    #[inline(always)]
    pub fn duration_s(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledNote {
    pub id: NoteId,
    pub record: NoteRecord,
    pub column: Column,
    /// `start - tick interval`, in seconds.
    pub release_deadline: f64,
}

impl ScheduledNote {
    pub fn new(id: NoteId, record: NoteRecord, tick_ms: f64) -> Self {
        let column = Column::from_pitch(record.pitch);
        let release_deadline = record.start - tick_ms / 1000.0;
        Self {
            id,
            record,
            column,
            release_deadline,
        }
    }

    #[inline(always)]
    pub fn user_played(&self) -> bool {
        self.record.user_played
    }
}
