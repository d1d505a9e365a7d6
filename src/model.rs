use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds, UTC. The only time type.
pub type Ms = i64;

/// Current wall-clock time.
pub fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or(0)
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Checked constructor for anything that crosses the wire.
    pub fn try_new(start: Ms, end: Ms) -> Result<Self, InvalidSpan> {
        if end <= start {
            return Err(InvalidSpan { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// Touching spans (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSpan {
    pub start: Ms,
    pub end: Ms,
}

impl fmt::Display for InvalidSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "end ({}) must be after start ({})", self.end, self.start)
    }
}

/// Returned by the `FromStr` impls of the tag enums below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTag {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownTag {}

// ── Status ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Pending,
    Confirmed,
    Cancelled,
    Finalized,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Pending,
        Status::Confirmed,
        Status::Cancelled,
        Status::Finalized,
    ];

    /// Active reservations hold their slot and take part in conflict checks.
    pub fn is_active(self) -> bool {
        matches!(self, Status::Pending | Status::Confirmed)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Confirmed => "confirmed",
            Status::Cancelled => "cancelled",
            Status::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Status::ALL
            .into_iter()
            .find(|st| st.as_str() == lower)
            .ok_or(UnknownTag { kind: "status", value: s.to_string() })
    }
}

// ── Role ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownTag { kind: "role", value: s.to_string() }),
        }
    }
}

// ── Space category ───────────────────────────────────────────────

/// Fixed room-type tags a space is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Classroom,
    DistanceLearning,
    FablabMeeting,
    WorkshopRoom,
    Auditorium,
    Library,
    ItLab,
    BuildingElectrical,
    IndustrialElectrical,
    ElectricalControls,
    Electrotechnics,
    Automation,
    AutomationInstrumentation,
    AutomationElectronics,
    Industry40,
    Hydraulics,
    Pneumatics,
    Metrology,
    Chemistry,
    WeldingShop,
    BoilermakingShop,
    WoodShop,
    MachiningShop,
    MaintenanceShop,
    PolymersShop,
    Fablab,
    Sewing,
    PatternMaking,
    RenewablesLab,
    Photovoltaics,
    RenewablesLabClassroom,
    RenewablesPreaccelerator,
    Logistics,
}

impl Category {
    pub const ALL: [Category; 33] = [
        Category::Classroom,
        Category::DistanceLearning,
        Category::FablabMeeting,
        Category::WorkshopRoom,
        Category::Auditorium,
        Category::Library,
        Category::ItLab,
        Category::BuildingElectrical,
        Category::IndustrialElectrical,
        Category::ElectricalControls,
        Category::Electrotechnics,
        Category::Automation,
        Category::AutomationInstrumentation,
        Category::AutomationElectronics,
        Category::Industry40,
        Category::Hydraulics,
        Category::Pneumatics,
        Category::Metrology,
        Category::Chemistry,
        Category::WeldingShop,
        Category::BoilermakingShop,
        Category::WoodShop,
        Category::MachiningShop,
        Category::MaintenanceShop,
        Category::PolymersShop,
        Category::Fablab,
        Category::Sewing,
        Category::PatternMaking,
        Category::RenewablesLab,
        Category::Photovoltaics,
        Category::RenewablesLabClassroom,
        Category::RenewablesPreaccelerator,
        Category::Logistics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Classroom => "classroom",
            Category::DistanceLearning => "distance_learning",
            Category::FablabMeeting => "fablab_meeting",
            Category::WorkshopRoom => "workshop_room",
            Category::Auditorium => "auditorium",
            Category::Library => "library",
            Category::ItLab => "it_lab",
            Category::BuildingElectrical => "building_electrical",
            Category::IndustrialElectrical => "industrial_electrical",
            Category::ElectricalControls => "electrical_controls",
            Category::Electrotechnics => "electrotechnics",
            Category::Automation => "automation",
            Category::AutomationInstrumentation => "automation_instrumentation",
            Category::AutomationElectronics => "automation_electronics",
            Category::Industry40 => "industry_4_0",
            Category::Hydraulics => "hydraulics",
            Category::Pneumatics => "pneumatics",
            Category::Metrology => "metrology",
            Category::Chemistry => "chemistry",
            Category::WeldingShop => "welding_shop",
            Category::BoilermakingShop => "boilermaking_shop",
            Category::WoodShop => "wood_shop",
            Category::MachiningShop => "machining_shop",
            Category::MaintenanceShop => "maintenance_shop",
            Category::PolymersShop => "polymers_shop",
            Category::Fablab => "fablab",
            Category::Sewing => "sewing",
            Category::PatternMaking => "pattern_making",
            Category::RenewablesLab => "renewables_lab",
            Category::Photovoltaics => "photovoltaics",
            Category::RenewablesLabClassroom => "renewables_lab_classroom",
            Category::RenewablesPreaccelerator => "renewables_preaccelerator",
            Category::Logistics => "logistics",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .ok_or(UnknownTag { kind: "category", value: s.to_string() })
    }
}

// ── Shift ────────────────────────────────────────────────────────

/// Coarse part-of-day bucket. Only used to group the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Morning,
    Afternoon,
    Evening,
}

impl Shift {
    /// Local wall-clock hours `[from, to)` covered by the shift.
    pub fn hours(self) -> (u32, u32) {
        match self {
            Shift::Morning => (6, 12),
            Shift::Afternoon => (12, 18),
            Shift::Evening => (18, 24),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Shift::Morning => "morning",
            Shift::Afternoon => "afternoon",
            Shift::Evening => "evening",
        }
    }
}

impl FromStr for Shift {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(Shift::Morning),
            "afternoon" => Ok(Shift::Afternoon),
            "evening" => Ok(Shift::Evening),
            _ => Err(UnknownTag { kind: "shift", value: s.to_string() }),
        }
    }
}

// ── Entities ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub id: Ulid,
    pub name: String,
    pub capacity: u32,
    pub description: String,
    pub category: Category,
    pub active: bool,
    pub tv: bool,
    pub projector: bool,
    pub air_conditioning: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Ulid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    pub created_at: Ms,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: Ulid,
    pub space_id: Ulid,
    pub account_id: Ulid,
    pub span: Span,
    pub reason: String,
    pub status: Status,
    pub created_at: Ms,
    /// Insertion order, assigned on apply. Breaks created_at ties.
    pub seq: u64,
}

/// Denormalized snapshot of a reservation that reached a terminal status.
/// Names are copied at archival time so the record outlives renames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Ulid,
    pub space_id: Ulid,
    pub account_id: Ulid,
    pub span: Span,
    pub reason: String,
    pub status: Status,
    pub created_at: Ms,
    pub space_name: String,
    pub account_name: String,
    pub archived_at: Ms,
    pub seq: u64,
}

/// An active reservation's footprint on its space's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub id: Ulid,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SpaceState {
    pub space: Space,
    /// Active (pending/confirmed) reservations only, sorted by `span.start`.
    pub slots: Vec<Slot>,
    /// Every reservation currently filed under this space, terminal ones included.
    pub reservations: HashMap<Ulid, Reservation>,
}

impl SpaceState {
    pub fn new(space: Space) -> Self {
        Self {
            space,
            slots: Vec::new(),
            reservations: HashMap::new(),
        }
    }

    /// Insert slot maintaining sort order by span.start.
    pub fn insert_slot(&mut self, slot: Slot) {
        let pos = self
            .slots
            .binary_search_by_key(&slot.span.start, |s| s.span.start)
            .unwrap_or_else(|e| e);
        self.slots.insert(pos, slot);
    }

    pub fn remove_slot(&mut self, id: Ulid) -> Option<Slot> {
        let pos = self.slots.iter().position(|s| s.id == id)?;
        Some(self.slots.remove(pos))
    }

    /// Slots whose span overlaps the query window.
    /// Binary search skips slots starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Slot> {
        let right_bound = self.slots.partition_point(|s| s.span.start < query.end);
        self.slots[..right_bound]
            .iter()
            .filter(move |s| s.span.end > query.start)
    }

    /// File a reservation here; active ones also claim their slot.
    pub fn insert_reservation(&mut self, reservation: Reservation) {
        if reservation.status.is_active() {
            self.insert_slot(Slot {
                id: reservation.id,
                span: reservation.span,
            });
        }
        self.reservations.insert(reservation.id, reservation);
    }

    /// Remove a reservation (and its slot) from this space.
    pub fn take_reservation(&mut self, id: Ulid) -> Option<Reservation> {
        let reservation = self.reservations.remove(&id)?;
        self.remove_slot(id);
        Some(reservation)
    }

    /// Move a reservation to a new span, keeping slot order.
    pub fn reschedule(&mut self, id: Ulid, span: Span, reason: String) {
        let Some(reservation) = self.reservations.get_mut(&id) else {
            return;
        };
        reservation.span = span;
        reservation.reason = reason;
        if reservation.status.is_active() {
            self.remove_slot(id);
            self.insert_slot(Slot { id, span });
        }
    }

    /// Set status; a terminal status frees the slot.
    pub fn set_status(&mut self, id: Ulid, status: Status) -> Option<&Reservation> {
        let reservation = self.reservations.get_mut(&id)?;
        reservation.status = status;
        if status.is_terminal() {
            self.remove_slot(id);
        }
        self.reservations.get(&id)
    }
}

/// Flat event types; this is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    SpaceCreated {
        id: Ulid,
        name: String,
        capacity: u32,
        description: String,
        category: Category,
        tv: bool,
        projector: bool,
        air_conditioning: bool,
    },
    SpaceUpdated {
        id: Ulid,
        name: String,
        capacity: u32,
        description: String,
        category: Category,
        active: bool,
        tv: bool,
        projector: bool,
        air_conditioning: bool,
    },
    AccountCreated {
        id: Ulid,
        name: String,
        email: String,
        role: Role,
        created_at: Ms,
    },
    AccountUpdated {
        id: Ulid,
        name: String,
        email: String,
        role: Role,
        active: bool,
    },
    ReservationCreated {
        id: Ulid,
        space_id: Ulid,
        account_id: Ulid,
        span: Span,
        reason: String,
        created_at: Ms,
    },
    ReservationUpdated {
        id: Ulid,
        from_space_id: Ulid,
        space_id: Ulid,
        span: Span,
        reason: String,
    },
    ReservationConfirmed {
        id: Ulid,
        space_id: Ulid,
    },
    /// Terminal transition and its history snapshot, written as one record.
    ReservationClosed {
        id: Ulid,
        space_id: Ulid,
        status: Status,
        space_name: String,
        account_name: String,
        at: Ms,
    },
}

// ── Query result types ───────────────────────────────────────────

/// A reservation with its space and account names resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationInfo {
    pub id: Ulid,
    pub space_id: Ulid,
    pub space_name: String,
    pub account_id: Ulid,
    pub account_name: String,
    pub start: Ms,
    pub end: Ms,
    pub reason: String,
    pub status: Status,
    pub created_at: Ms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Conflict(Ulid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRow {
    pub space_name: String,
    pub category: Category,
    pub start: Ms,
    pub end: Ms,
    pub account_name: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> Space {
        Space {
            id: Ulid::new(),
            name: "Lab 1".into(),
            capacity: 20,
            description: String::new(),
            category: Category::ItLab,
            active: true,
            tv: false,
            projector: true,
            air_conditioning: true,
        }
    }

    fn reservation(start: Ms, end: Ms, status: Status) -> Reservation {
        Reservation {
            id: Ulid::new(),
            space_id: Ulid::new(),
            account_id: Ulid::new(),
            span: Span::new(start, end),
            reason: "class".into(),
            status,
            created_at: 0,
            seq: 0,
        }
    }

    #[test]
    fn span_basics() {
        let s = Span::new(100, 200);
        assert_eq!(s.duration_ms(), 100);
        assert!(s.contains_instant(100));
        assert!(s.contains_instant(199));
        assert!(!s.contains_instant(200)); // half-open
    }

    #[test]
    fn span_try_new_rejects_inverted_and_empty() {
        assert_eq!(Span::try_new(200, 100), Err(InvalidSpan { start: 200, end: 100 }));
        assert!(Span::try_new(100, 100).is_err());
        assert_eq!(Span::try_new(100, 101), Ok(Span::new(100, 101)));
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(100, 200);
        let b = Span::new(150, 250);
        let c = Span::new(200, 300);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn span_overlap_one_minute_in() {
        const M: Ms = 60_000;
        let ten_to_eleven = Span::new(600 * M, 660 * M);
        let eleven_to_noon = Span::new(660 * M, 720 * M);
        let ten_fifty_nine = Span::new(659 * M, 690 * M);
        assert!(!ten_to_eleven.overlaps(&eleven_to_noon));
        assert!(ten_to_eleven.overlaps(&ten_fifty_nine));
    }

    #[test]
    fn status_partitions() {
        let active: Vec<_> = Status::ALL.into_iter().filter(|s| s.is_active()).collect();
        assert_eq!(active, vec![Status::Pending, Status::Confirmed]);
        assert!(Status::Cancelled.is_terminal());
        assert!(Status::Finalized.is_terminal());
    }

    #[test]
    fn tags_parse_case_insensitively() {
        assert_eq!("Confirmed".parse::<Status>(), Ok(Status::Confirmed));
        assert_eq!(" ADMIN ".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("it_lab".parse::<Category>(), Ok(Category::ItLab));
        assert_eq!("Evening".parse::<Shift>(), Ok(Shift::Evening));
        assert!("confirmada".parse::<Status>().is_err());
    }

    #[test]
    fn category_tags_are_unique() {
        let mut tags: Vec<_> = Category::ALL.iter().map(|c| c.as_str()).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), Category::ALL.len());
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>(), Ok(c));
        }
    }

    #[test]
    fn slots_stay_sorted() {
        let mut st = SpaceState::new(space());
        st.insert_reservation(reservation(300, 400, Status::Pending));
        st.insert_reservation(reservation(100, 200, Status::Confirmed));
        st.insert_reservation(reservation(200, 300, Status::Pending));
        let starts: Vec<_> = st.slots.iter().map(|s| s.span.start).collect();
        assert_eq!(starts, vec![100, 200, 300]);
    }

    #[test]
    fn terminal_reservations_hold_no_slot() {
        let mut st = SpaceState::new(space());
        let r = reservation(100, 200, Status::Cancelled);
        let id = r.id;
        st.insert_reservation(r);
        assert!(st.slots.is_empty());
        assert!(st.reservations.contains_key(&id));
    }

    #[test]
    fn set_status_terminal_frees_slot() {
        let mut st = SpaceState::new(space());
        let r = reservation(100, 200, Status::Confirmed);
        let id = r.id;
        st.insert_reservation(r);
        st.set_status(id, Status::Finalized);
        assert!(st.slots.is_empty());
        assert_eq!(st.reservations[&id].status, Status::Finalized);
    }

    #[test]
    fn reschedule_reorders_slot() {
        let mut st = SpaceState::new(space());
        let a = reservation(100, 200, Status::Pending);
        let b = reservation(300, 400, Status::Pending);
        let a_id = a.id;
        st.insert_reservation(a);
        st.insert_reservation(b);
        st.reschedule(a_id, Span::new(500, 600), "moved".into());
        assert_eq!(st.slots.last().map(|s| s.id), Some(a_id));
        assert_eq!(st.reservations[&a_id].reason, "moved");
    }

    #[test]
    fn overlapping_skips_past_and_future() {
        let mut st = SpaceState::new(space());
        st.insert_reservation(reservation(100, 200, Status::Pending));
        st.insert_reservation(reservation(450, 600, Status::Pending));
        st.insert_reservation(reservation(1000, 1100, Status::Pending));

        let hits: Vec<_> = st.overlapping(&Span::new(500, 800)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].span, Span::new(450, 600));
    }

    #[test]
    fn overlapping_adjacent_not_included() {
        let mut st = SpaceState::new(space());
        st.insert_reservation(reservation(100, 200, Status::Pending));
        assert_eq!(st.overlapping(&Span::new(200, 300)).count(), 0);
        assert_eq!(st.overlapping(&Span::new(0, 100)).count(), 0);
    }

    #[test]
    fn take_reservation_removes_slot() {
        let mut st = SpaceState::new(space());
        let r = reservation(100, 200, Status::Pending);
        let id = r.id;
        st.insert_reservation(r);
        let taken = st.take_reservation(id).unwrap();
        assert_eq!(taken.id, id);
        assert!(st.slots.is_empty());
        assert!(st.take_reservation(id).is_none());
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::ReservationClosed {
            id: Ulid::new(),
            space_id: Ulid::new(),
            status: Status::Finalized,
            space_name: "Auditório".into(),
            account_name: "Ana".into(),
            at: 1_736_500_000_000,
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
