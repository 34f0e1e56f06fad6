use serde::{Deserialize, Serialize};
use std::fmt;

/// The tools an assistant may call, as known to the renderer.
///
/// Tool names outside this set parse to `Unknown` and keep their original
/// name, so parsing never fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolKind {
    GetWeather,
    DisplayFlightStatus,
    SearchFlights,
    SelectSeats,
    CreateReservation,
    AuthorizePayment,
    DisplayBoardingPass,
    VerifyPayment,
    Unknown(String),
}

impl ToolKind {
    pub const KNOWN: [ToolKind; 8] = [
        ToolKind::GetWeather,
        ToolKind::DisplayFlightStatus,
        ToolKind::SearchFlights,
        ToolKind::SelectSeats,
        ToolKind::CreateReservation,
        ToolKind::AuthorizePayment,
        ToolKind::DisplayBoardingPass,
        ToolKind::VerifyPayment,
    ];

    pub fn parse(name: &str) -> Self {
        match name {
            "getWeather" => ToolKind::GetWeather,
            "displayFlightStatus" => ToolKind::DisplayFlightStatus,
            "searchFlights" => ToolKind::SearchFlights,
            "selectSeats" => ToolKind::SelectSeats,
            "createReservation" => ToolKind::CreateReservation,
            "authorizePayment" => ToolKind::AuthorizePayment,
            "displayBoardingPass" => ToolKind::DisplayBoardingPass,
            "verifyPayment" => ToolKind::VerifyPayment,
            other => ToolKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ToolKind::GetWeather => "getWeather",
            ToolKind::DisplayFlightStatus => "displayFlightStatus",
            ToolKind::SearchFlights => "searchFlights",
            ToolKind::SelectSeats => "selectSeats",
            ToolKind::CreateReservation => "createReservation",
            ToolKind::AuthorizePayment => "authorizePayment",
            ToolKind::DisplayBoardingPass => "displayBoardingPass",
            ToolKind::VerifyPayment => "verifyPayment",
            ToolKind::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ToolKind::Unknown(_))
    }

    /// Whether a pending call of this kind has a placeholder to show.
    pub fn has_skeleton(&self) -> bool {
        match self {
            ToolKind::GetWeather
            | ToolKind::DisplayFlightStatus
            | ToolKind::SearchFlights
            | ToolKind::SelectSeats
            | ToolKind::CreateReservation
            | ToolKind::AuthorizePayment
            | ToolKind::DisplayBoardingPass => true,
            ToolKind::VerifyPayment | ToolKind::Unknown(_) => false,
        }
    }
}

impl From<String> for ToolKind {
    fn from(name: String) -> Self {
        ToolKind::parse(&name)
    }
}

impl From<&str> for ToolKind {
    fn from(name: &str) -> Self {
        ToolKind::parse(name)
    }
}

impl From<ToolKind> for String {
    fn from(kind: ToolKind) -> Self {
        match kind {
            ToolKind::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
