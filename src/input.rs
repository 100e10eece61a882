use crate::error::SimError;
use crate::simulation::{DemandLevel, IncidentKind, SystemMode, MAX_PHASE_SECONDS};

/// Everything the presentation layer may ask of the simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SelectIntersection(String),
    SetMode(SystemMode),
    SetGreen(u32),
    SetYellow(u32),
    SetRed(u32),
    SetSpeed(u32),
    Play,
    Pause,
    Reset,
    SetDemand(DemandLevel),
    ToggleEmergency,
    TriggerIncident(IncidentKind),
}

impl Command {
    /// Builds a command from a raw slider reading. Non-numeric or non-positive values are
    /// rejected here so they never reach the phase clock.
    pub fn from_slider(slider: &str, raw: &str) -> Result<Command, SimError> {
        match slider {
            "green" => Ok(Command::SetGreen(parse_seconds("green", raw)?)),
            "yellow" => Ok(Command::SetYellow(parse_seconds("yellow", raw)?)),
            "red" => Ok(Command::SetRed(parse_seconds("red", raw)?)),
            "speed" => {
                let value = parse_whole(raw)?;
                if value < 1 {
                    return Err(SimError::InvalidSpeed { value, max: u32::MAX });
                }
                Ok(Command::SetSpeed(value.min(u32::MAX as i64) as u32))
            }
            other => Err(SimError::UnknownControl(other.to_string())),
        }
    }

    /// Builds a command from a named control and its value, as a form or key binding
    /// would deliver it.
    pub fn parse(control: &str, value: &str) -> Result<Command, SimError> {
        match control {
            "intersection" => Ok(Command::SelectIntersection(value.trim().to_string())),
            "mode" => Ok(Command::SetMode(value.parse()?)),
            "demand" => Ok(Command::SetDemand(value.parse()?)),
            "incident" => Ok(Command::TriggerIncident(value.parse()?)),
            "play" => Ok(Command::Play),
            "pause" => Ok(Command::Pause),
            "reset" => Ok(Command::Reset),
            "emergency" => Ok(Command::ToggleEmergency),
            slider => Command::from_slider(slider, value),
        }
    }
}

/// Parses a whole number of seconds in `1..=MAX_PHASE_SECONDS` for the named duration.
pub fn parse_seconds(field: &'static str, raw: &str) -> Result<u32, SimError> {
    let value = parse_whole(raw)?;
    if value < 1 || value > MAX_PHASE_SECONDS as i64 {
        return Err(SimError::InvalidDuration { field, value });
    }
    Ok(value as u32)
}

fn parse_whole(raw: &str) -> Result<i64, SimError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| SimError::NotANumber(raw.to_string()))
}
