//! Messages from connections to the pump

use crate::core::PlayerId;
use crate::game::{AdminCommand, FeedbackRequest, FeedbackResponse, PlayerAction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inbound {
    Action { player: PlayerId, action: PlayerAction },
    Feedback { player: PlayerId, response: FeedbackResponse },
    Connect(PlayerId),
    Disconnect(PlayerId),
    Admin(AdminCommand),
    /// Stop the pump after everything queued before it
    Shutdown,
}

impl Inbound {
    /// Can this message settle the suspended `request`
    ///
    /// Everything else is deferred until the request is answered.
    pub fn settles(&self, request: &FeedbackRequest) -> bool {
        match self {
            Inbound::Feedback { player, .. } | Inbound::Disconnect(player) => *player == request.player,
            Inbound::Admin(_) | Inbound::Shutdown => true,
            Inbound::Action { .. } | Inbound::Connect(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UnitId;
    use crate::game::events::{AmsOption, FeedbackKind};

    fn request(player: PlayerId) -> FeedbackRequest {
        FeedbackRequest {
            token: 1,
            player,
            kind: FeedbackKind::AmsTarget {
                defender: UnitId::new(1),
                options: Vec::<AmsOption>::new(),
            },
        }
    }

    #[test]
    fn test_only_the_addressee_settles_a_request() {
        let (me, other) = (PlayerId::new(1), PlayerId::new(2));
        let req = request(me);
        let answer = |player| Inbound::Feedback {
            player,
            response: FeedbackResponse { token: 1, choice: 0 },
        };
        assert!(answer(me).settles(&req));
        assert!(!answer(other).settles(&req));
        assert!(Inbound::Disconnect(me).settles(&req));
        assert!(!Inbound::Disconnect(other).settles(&req));
        assert!(!Inbound::Action {
            player: me,
            action: PlayerAction::Done
        }
        .settles(&req));
        assert!(Inbound::Admin(AdminCommand::ForceAdvancePhase).settles(&req));
    }
}
