//! Topic taxonomy shared with devices on the transport.
//!
//! ```text
//! home/{requests,response}
//! home/rooms/<room>/{requests,response,interrupt}
//! home/rooms/<room>/things/<device>/{requests,response,interrupt}
//! ```
//!
//! Rooms listen for device interrupts through a `+` wildcard at the
//! device segment.

const ROOT: &str = "home";

/// What a message carries, derived from the final topic segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Response,
    Interrupt,
}

impl MessageKind {
    /// Classify a concrete topic, `None` when it is outside the taxonomy.
    #[must_use]
    pub fn from_topic(topic: &str) -> Option<Self> {
        match topic.rsplit('/').next()? {
            "requests" => Some(Self::Request),
            "response" => Some(Self::Response),
            "interrupt" => Some(Self::Interrupt),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_segment(self) -> &'static str {
        match self {
            Self::Request => "requests",
            Self::Response => "response",
            Self::Interrupt => "interrupt",
        }
    }
}

#[must_use]
pub fn home(kind: MessageKind) -> String {
    format!("{ROOT}/{}", kind.as_segment())
}

#[must_use]
pub fn room(room: &str, kind: MessageKind) -> String {
    format!("{ROOT}/rooms/{room}/{}", kind.as_segment())
}

#[must_use]
pub fn device(room: &str, device: &str, kind: MessageKind) -> String {
    format!("{ROOT}/rooms/{room}/things/{device}/{}", kind.as_segment())
}

/// Filter matching interrupts from every device of a room.
#[must_use]
pub fn room_device_interrupts(room: &str) -> String {
    format!("{ROOT}/rooms/{room}/things/+/interrupt")
}

/// Turn a display name into a topic segment: `Front Door` → `front_door`.
#[must_use]
pub fn slug(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// MQTT-style filter match supporting `+` (one level) and trailing `#`.
#[must_use]
pub fn matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_taxonomy_topics() {
        assert_eq!(home(MessageKind::Request), "home/requests");
        assert_eq!(home(MessageKind::Response), "home/response");
        assert_eq!(
            room("kitchen", MessageKind::Interrupt),
            "home/rooms/kitchen/interrupt"
        );
        assert_eq!(
            device("kitchen", "front_door", MessageKind::Request),
            "home/rooms/kitchen/things/front_door/requests"
        );
        assert_eq!(
            room_device_interrupts("kitchen"),
            "home/rooms/kitchen/things/+/interrupt"
        );
    }

    #[test]
    fn should_classify_topics_by_last_segment() {
        assert_eq!(
            MessageKind::from_topic("home/rooms/kitchen/things/front_door/response"),
            Some(MessageKind::Response)
        );
        assert_eq!(
            MessageKind::from_topic("home/requests"),
            Some(MessageKind::Request)
        );
        assert_eq!(
            MessageKind::from_topic("home/rooms/kitchen/things/x/interrupt"),
            Some(MessageKind::Interrupt)
        );
        assert_eq!(MessageKind::from_topic("home/rooms/kitchen/status"), None);
    }

    #[test]
    fn should_slug_display_names() {
        assert_eq!(slug("Front Door"), "front_door");
        assert_eq!(slug(" Master-Bedroom "), "master_bedroom");
    }

    #[test]
    fn should_match_single_level_wildcard() {
        let filter = room_device_interrupts("kitchen");
        assert!(matches(&filter, "home/rooms/kitchen/things/front_door/interrupt"));
        assert!(!matches(&filter, "home/rooms/garage/things/front_door/interrupt"));
        assert!(!matches(&filter, "home/rooms/kitchen/things/interrupt"));
    }

    #[test]
    fn should_match_multi_level_wildcard_and_exact_topics() {
        assert!(matches("home/#", "home/rooms/kitchen/requests"));
        assert!(matches("home/requests", "home/requests"));
        assert!(!matches("home/requests", "home/requests/extra"));
    }
}
