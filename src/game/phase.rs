//! Game phases and the successor function

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phases of a game round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Phase {
    #[default]
    Lounge,

    // Game start only
    DeployMinefields,
    DeployMinefieldsReport,
    SetArtilleryTargets,
    SetArtilleryTargetsReport,

    // Every round
    Initiative,
    InitiativeReport,
    Deployment,
    DeploymentReport,
    Targeting,
    TargetingReport,
    Movement,
    MovementReport,
    Offboard,
    OffboardReport,
    Firing,
    FiringReport,
    Physical,
    PhysicalReport,
    End,
    EndReport,

    Victory,
}

/// Facts the successor function depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseContext {
    /// Any player still has minefields to place
    pub mines_to_place: bool,
    /// Any artillery is on the field
    pub artillery_present: bool,
    /// Units remain to deploy this round
    pub units_to_deploy: bool,
    /// The victory check at the end of the round found a result
    pub game_over: bool,
}

impl Phase {
    pub fn is_report(&self) -> bool {
        matches!(
            self,
            Phase::DeployMinefieldsReport
                | Phase::SetArtilleryTargetsReport
                | Phase::InitiativeReport
                | Phase::DeploymentReport
                | Phase::TargetingReport
                | Phase::MovementReport
                | Phase::OffboardReport
                | Phase::FiringReport
                | Phase::PhysicalReport
                | Phase::EndReport
        )
    }

    /// The report sub-state paired with an action phase
    pub fn report(&self) -> Option<Phase> {
        match self {
            Phase::DeployMinefields => Some(Phase::DeployMinefieldsReport),
            Phase::SetArtilleryTargets => Some(Phase::SetArtilleryTargetsReport),
            Phase::Initiative => Some(Phase::InitiativeReport),
            Phase::Deployment => Some(Phase::DeploymentReport),
            Phase::Targeting => Some(Phase::TargetingReport),
            Phase::Movement => Some(Phase::MovementReport),
            Phase::Offboard => Some(Phase::OffboardReport),
            Phase::Firing => Some(Phase::FiringReport),
            Phase::Physical => Some(Phase::PhysicalReport),
            Phase::End => Some(Phase::EndReport),
            _ => None,
        }
    }

    /// Phases driven by a turn queue
    pub fn has_turns(&self) -> bool {
        matches!(
            self,
            Phase::DeployMinefields
                | Phase::SetArtilleryTargets
                | Phase::Deployment
                | Phase::Targeting
                | Phase::Movement
                | Phase::Offboard
                | Phase::Firing
                | Phase::Physical
        )
    }

    /// Phases whose declared attacks are resolved when the phase ends
    pub fn is_attack_phase(&self) -> bool {
        matches!(
            self,
            Phase::Targeting | Phase::Offboard | Phase::Firing | Phase::Physical
        )
    }

    /// Phases in which the lowest initiative acts first
    pub fn lowest_initiative_first(&self) -> bool {
        matches!(self, Phase::Deployment | Phase::Movement)
    }

    /// Phases that wait for every player to report ready
    pub fn waits_for_ready(&self) -> bool {
        *self == Phase::Lounge || self.is_report()
    }

    /// Next phase in the round
    pub fn next(&self, ctx: &PhaseContext) -> Phase {
        match self {
            Phase::Lounge => {
                if ctx.mines_to_place {
                    Phase::DeployMinefields
                } else if ctx.artillery_present {
                    Phase::SetArtilleryTargets
                } else {
                    Phase::Initiative
                }
            }
            Phase::DeployMinefields => Phase::DeployMinefieldsReport,
            Phase::DeployMinefieldsReport => {
                if ctx.artillery_present {
                    Phase::SetArtilleryTargets
                } else {
                    Phase::Initiative
                }
            }
            Phase::SetArtilleryTargets => Phase::SetArtilleryTargetsReport,
            Phase::SetArtilleryTargetsReport => Phase::Initiative,
            Phase::Initiative => Phase::InitiativeReport,
            Phase::InitiativeReport => {
                if ctx.units_to_deploy {
                    Phase::Deployment
                } else {
                    Phase::DeploymentReport
                }
            }
            Phase::Deployment => Phase::DeploymentReport,
            Phase::DeploymentReport => Phase::Targeting,
            Phase::Targeting => Phase::TargetingReport,
            Phase::TargetingReport => Phase::Movement,
            Phase::Movement => Phase::MovementReport,
            Phase::MovementReport => Phase::Offboard,
            Phase::Offboard => Phase::OffboardReport,
            Phase::OffboardReport => Phase::Firing,
            Phase::Firing => Phase::FiringReport,
            Phase::FiringReport => Phase::Physical,
            Phase::Physical => Phase::PhysicalReport,
            Phase::PhysicalReport => Phase::End,
            Phase::End => Phase::EndReport,
            Phase::EndReport => {
                if ctx.game_over {
                    Phase::Victory
                } else {
                    Phase::Initiative
                }
            }
            Phase::Victory => Phase::Victory,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Lounge => "Lounge",
            Phase::DeployMinefields => "Deploy Minefields",
            Phase::DeployMinefieldsReport => "Deploy Minefields Report",
            Phase::SetArtilleryTargets => "Set Artillery Targets",
            Phase::SetArtilleryTargetsReport => "Set Artillery Targets Report",
            Phase::Initiative => "Initiative",
            Phase::InitiativeReport => "Initiative Report",
            Phase::Deployment => "Deployment",
            Phase::DeploymentReport => "Deployment Report",
            Phase::Targeting => "Targeting",
            Phase::TargetingReport => "Targeting Report",
            Phase::Movement => "Movement",
            Phase::MovementReport => "Movement Report",
            Phase::Offboard => "Offboard",
            Phase::OffboardReport => "Offboard Report",
            Phase::Firing => "Firing",
            Phase::FiringReport => "Firing Report",
            Phase::Physical => "Physical",
            Phase::PhysicalReport => "Physical Report",
            Phase::End => "End",
            Phase::EndReport => "End Report",
            Phase::Victory => "Victory",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(start: Phase, ctx: &PhaseContext, stop: Phase) -> Vec<Phase> {
        let mut phases = vec![start];
        let mut current = start;
        while current != stop {
            current = current.next(ctx);
            phases.push(current);
            assert!(phases.len() < 40, "successor loop did not reach {:?}", stop);
        }
        phases
    }

    #[test]
    fn test_plain_round_order() {
        let ctx = PhaseContext::default();
        let phases = walk(Phase::Initiative, &ctx, Phase::EndReport);
        assert_eq!(
            phases,
            vec![
                Phase::Initiative,
                Phase::InitiativeReport,
                Phase::DeploymentReport,
                Phase::Targeting,
                Phase::TargetingReport,
                Phase::Movement,
                Phase::MovementReport,
                Phase::Offboard,
                Phase::OffboardReport,
                Phase::Firing,
                Phase::FiringReport,
                Phase::Physical,
                Phase::PhysicalReport,
                Phase::End,
                Phase::EndReport,
            ]
        );
        assert_eq!(Phase::EndReport.next(&ctx), Phase::Initiative);
    }

    #[test]
    fn test_game_start_branches() {
        let ctx = PhaseContext {
            mines_to_place: true,
            artillery_present: true,
            units_to_deploy: true,
            game_over: false,
        };
        let phases = walk(Phase::Lounge, &ctx, Phase::Deployment);
        assert_eq!(
            phases,
            vec![
                Phase::Lounge,
                Phase::DeployMinefields,
                Phase::DeployMinefieldsReport,
                Phase::SetArtilleryTargets,
                Phase::SetArtilleryTargetsReport,
                Phase::Initiative,
                Phase::InitiativeReport,
                Phase::Deployment,
            ]
        );
    }

    #[test]
    fn test_victory_is_terminal() {
        let ctx = PhaseContext {
            game_over: true,
            ..Default::default()
        };
        assert_eq!(Phase::EndReport.next(&ctx), Phase::Victory);
        assert_eq!(Phase::Victory.next(&ctx), Phase::Victory);
    }

    #[test]
    fn test_every_phase_but_lounge_and_victory_has_report() {
        for phase in [
            Phase::DeployMinefields,
            Phase::SetArtilleryTargets,
            Phase::Initiative,
            Phase::Deployment,
            Phase::Targeting,
            Phase::Movement,
            Phase::Offboard,
            Phase::Firing,
            Phase::Physical,
            Phase::End,
        ] {
            let report = phase.report().unwrap();
            assert!(report.is_report());
            assert_eq!(phase.next(&PhaseContext::default()), report);
        }
        assert!(Phase::Lounge.report().is_none());
        assert!(Phase::Victory.report().is_none());
    }
}
