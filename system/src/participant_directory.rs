use crate::types::{Color, ConnectionId, ParticipantId, ParticipantSummary};

pub const DEFAULT_PALETTE: [&str; 12] = [
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
    "#bcf60c", "#fabebe", "#008080", "#e6beff",
];

/// Round-robin color source. The index only moves forward and wraps.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<Color>,
    next: usize,
}

impl Palette {
    /// `None` for an empty color list.
    pub fn new(colors: Vec<Color>) -> Option<Self> {
        if colors.is_empty() {
            None
        } else {
            Some(Self { colors, next: 0 })
        }
    }

    pub fn next_color(&mut self) -> Color {
        let color = self.colors[self.next % self.colors.len()].clone();
        self.next = self.next.wrapping_add(1);
        color
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            next: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: ParticipantId,
    pub connection_id: ConnectionId,
    pub name: String,
    pub color: Color,
}

impl Participant {
    pub fn summary(&self) -> ParticipantSummary {
        ParticipantSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            color: self.color.clone(),
        }
    }
}

/// Live participants of one session, in admission order.
#[derive(Debug)]
pub struct ParticipantDirectory {
    palette: Palette,
    participants: Vec<Participant>,
}

impl ParticipantDirectory {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            participants: Vec::new(),
        }
    }

    pub fn admit(&mut self, connection_id: ConnectionId) -> Participant {
        let participant = Participant {
            id: ParticipantId::generate(),
            connection_id,
            name: guest_name(),
            color: self.palette.next_color(),
        };
        self.participants.push(participant.clone());
        participant
    }

    pub fn remove(&mut self, participant_id: &ParticipantId) -> Option<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| &p.id == participant_id)?;
        Some(self.participants.remove(index))
    }

    pub fn remove_connection(&mut self, connection_id: &ConnectionId) -> Option<Participant> {
        let participant_id = self.by_connection(connection_id)?.id.clone();
        self.remove(&participant_id)
    }

    /// Empty names leave the current one in place.
    pub fn rename(&mut self, participant_id: &ParticipantId, new_name: &str) -> bool {
        if new_name.is_empty() {
            return false;
        }
        match self.participants.iter_mut().find(|p| &p.id == participant_id) {
            Some(participant) => {
                participant.name = new_name.to_owned();
                true
            }
            None => false,
        }
    }

    pub fn by_connection(&self, connection_id: &ConnectionId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| &p.connection_id == connection_id)
    }

    pub fn list(&self) -> Vec<ParticipantSummary> {
        self.participants.iter().map(Participant::summary).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn count(&self) -> usize {
        self.participants.len()
    }
}

fn guest_name() -> String {
    let bytes = uuid::Uuid::new_v4();
    let bytes = bytes.as_bytes();
    format!("Guest-{}", u16::from_le_bytes([bytes[0], bytes[1]]) % 1000)
}
