use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PIN_LENGTH: usize = 4;
pub const MAX_DRAW_ATTEMPTS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    pub pin: String,
}

impl Participant {
    pub fn has_pin(&self) -> bool {
        !self.pin.is_empty()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SantaError {
    #[error("a name is required")]
    EmptyName,
    #[error("that name is already registered")]
    DuplicateName,
    #[error("the PIN must be exactly 4 digits")]
    InvalidPinLength,
    #[error("no participant at that position")]
    IndexOutOfRange,
    #[error("at least two participants are needed for a draw")]
    InsufficientParticipants,
    #[error("the draw could not find a valid assignment, try again")]
    DrawFailed,
    #[error("the draw has not been performed yet")]
    DrawNotYetPerformed,
    #[error("enter your name to look up your recipient")]
    NameRequired,
    #[error("that name is not registered as a participant")]
    UnknownParticipant,
    #[error("wrong PIN for this participant")]
    WrongPin,
    #[error("this participant has no PIN, leave it blank")]
    UnexpectedPin,
    #[error("wrong admin passphrase")]
    WrongAdminPassphrase,
}

/// Giver -> recipient pairs in registration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
    pairs: Vec<(String, String)>,
}

impl Assignment {
    pub fn recipient_of(&self, giver: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(from, _)| from == giver)
            .map(|(_, to)| to.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Rejection sampling: shuffle, validate, retry up to the attempt ceiling.
/// With exactly two names the no-self and no-reciprocal rules can never
/// both hold, so that case always exhausts the ceiling into `DrawFailed`.
pub fn draw_assignment<R: Rng>(names: &[String], rng: &mut R) -> Result<Assignment, SantaError> {
    if names.len() < 2 {
        return Err(SantaError::InsufficientParticipants);
    }

    let mut candidate = names.to_vec();
    for _ in 0..MAX_DRAW_ATTEMPTS {
        candidate.shuffle(rng);
        if assignment_valid(names, &candidate) {
            let pairs = names
                .iter()
                .cloned()
                .zip(candidate.iter().cloned())
                .collect();
            return Ok(Assignment { pairs });
        }
    }

    Err(SantaError::DrawFailed)
}

fn assignment_valid(givers: &[String], candidate: &[String]) -> bool {
    for i in 0..givers.len() {
        // Nobody gifts themselves.
        if candidate[i] == givers[i] {
            return false;
        }
        // No reciprocal pair: A -> B together with B -> A.
        if let Some(k) = givers.iter().position(|name| *name == candidate[i]) {
            if candidate[k] == givers[i] {
                return false;
            }
        }
    }
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    participants: Vec<Participant>,
    assignment: Option<Assignment>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, pin: &str) -> Result<Participant, SantaError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SantaError::EmptyName);
        }
        if self.find_by_name(name).is_some() {
            return Err(SantaError::DuplicateName);
        }
        if !pin.is_empty()
            && (pin.chars().count() != PIN_LENGTH || !pin.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(SantaError::InvalidPinLength);
        }

        let participant = Participant {
            name: name.to_string(),
            pin: pin.to_string(),
        };
        self.participants.push(participant.clone());
        Ok(participant)
    }

    /// Removing after a draw leaves the assignment untouched; lookups for
    /// the removed name simply stop resolving.
    pub fn remove(&mut self, index: usize) -> Result<Participant, SantaError> {
        if index >= self.participants.len() {
            return Err(SantaError::IndexOutOfRange);
        }
        Ok(self.participants.remove(index))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Participant> {
        let needle = name.to_lowercase();
        self.participants
            .iter()
            .find(|p| p.name.to_lowercase() == needle)
    }

    pub fn count(&self) -> usize {
        self.participants.len()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn drawn(&self) -> bool {
        self.assignment.is_some()
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        self.assignment.as_ref()
    }

    /// Runs the engine over the current registry. A repeat call overwrites
    /// the previous assignment; the surrounding application hides the draw
    /// trigger after the first success.
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Result<&Assignment, SantaError> {
        let names: Vec<String> = self.participants.iter().map(|p| p.name.clone()).collect();
        let assignment = draw_assignment(&names, rng)?;
        Ok(self.assignment.insert(assignment))
    }

    pub fn resolve(&self, name: &str, pin: &str) -> Result<&str, SantaError> {
        let assignment = self
            .assignment
            .as_ref()
            .ok_or(SantaError::DrawNotYetPerformed)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(SantaError::NameRequired);
        }

        let participant = self
            .find_by_name(name)
            .ok_or(SantaError::UnknownParticipant)?;

        if participant.has_pin() && pin != participant.pin {
            return Err(SantaError::WrongPin);
        }
        if !participant.has_pin() && !pin.is_empty() {
            return Err(SantaError::UnexpectedPin);
        }

        assignment
            .recipient_of(&participant.name)
            .ok_or(SantaError::UnknownParticipant)
    }

    /// Admin gate: a static shared passphrase, nothing stronger. The caller
    /// supplies the expected value from its configuration.
    pub fn reveal_all(
        &self,
        passphrase: &str,
        expected: &str,
    ) -> Result<&[(String, String)], SantaError> {
        if passphrase.trim() != expected {
            return Err(SantaError::WrongAdminPassphrase);
        }
        let assignment = self
            .assignment
            .as_ref()
            .ok_or(SantaError::DrawNotYetPerformed)?;
        Ok(assignment.pairs())
    }

    pub fn reset(&mut self) {
        self.participants.clear();
        self.assignment = None;
    }
}
