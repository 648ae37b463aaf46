/*
 * Population Module
 *
 * The flock as a fixed-size, contiguous vector of agent records. An agent's
 * id is its index, so workers can be handed plain sub-slices and the index
 * can refer back to agents without any lookup table.
 */

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::boid::{Agent, AgentId};
use crate::error::ConfigError;
use crate::params::SimulationParams;

#[derive(Debug, Clone)]
pub struct AgentPopulation {
    agents: Vec<Agent>,
}

impl AgentPopulation {
    /// Takes ownership of host-built agents. Ids are reassigned to match
    /// their position in `agents`.
    pub fn new(mut agents: Vec<Agent>) -> Result<Self, ConfigError> {
        if agents.is_empty() {
            return Err(ConfigError::EmptyPopulation);
        }
        if agents.len() > u32::MAX as usize {
            return Err(ConfigError::invalid("population exceeds the agent id range"));
        }

        for (i, agent) in agents.iter_mut().enumerate() {
            agent.id = AgentId(i as u32);
        }
        Ok(Self { agents })
    }

    /// Scatters `num_agents` resting agents around the world center.
    pub fn spawn(params: &SimulationParams) -> Result<Self, ConfigError> {
        params.validate()?;

        let mut rng = StdRng::seed_from_u64(params.seed);
        let half = params.spawn_half_extent;

        let agents = (0..params.num_agents)
            .map(|i| {
                let offset = if half > 0.0 {
                    Vec2::new(rng.gen_range(-half..half), rng.gen_range(-half..half))
                } else {
                    Vec2::ZERO
                };
                Agent::new(AgentId(i as u32), params.world_center + offset, params.drag, params.max_speed)
            })
            .collect();

        Self::new(agents)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.index())
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id.index())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Agent> {
        self.agents.iter()
    }

    pub fn as_slice(&self) -> &[Agent] {
        &self.agents
    }

    /// Mutable records. The slice cannot grow or shrink, so ids stay valid.
    pub fn as_mut_slice(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.agents.iter().map(|a| a.position)
    }

    /// Applies drag and max speed to every agent.
    pub fn set_motion_limits(&mut self, drag: f32, max_speed: f32) {
        for agent in &mut self.agents {
            agent.drag = drag;
            agent.max_speed = max_speed;
        }
    }
}

impl<'a> IntoIterator for &'a AgentPopulation {
    type Item = &'a Agent;
    type IntoIter = std::slice::Iter<'a, Agent>;

    fn into_iter(self) -> Self::IntoIter {
        self.agents.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadtree::Bounds;

    #[test]
    fn new_rejects_empty_population() {
        assert_eq!(AgentPopulation::new(Vec::new()).unwrap_err(), ConfigError::EmptyPopulation);
    }

    #[test]
    fn new_assigns_ids_by_index() {
        let agents = vec![
            Agent::new(AgentId(9), Vec2::ZERO, 1.0, 1.0),
            Agent::new(AgentId(9), Vec2::ONE, 1.0, 1.0),
        ];
        let population = AgentPopulation::new(agents).expect("non-empty");
        assert_eq!(population.get(AgentId(1)).map(|a| a.position), Some(Vec2::ONE));
        assert!(population.iter().enumerate().all(|(i, a)| a.id.index() == i));
    }

    #[test]
    fn spawn_is_seeded_and_inside_spawn_area() {
        let params = SimulationParams {
            num_agents: 500,
            spawn_half_extent: 50.0,
            world_center: Vec2::new(100.0, -100.0),
            ..SimulationParams::default()
        };
        let a = AgentPopulation::spawn(&params).expect("valid params");
        let b = AgentPopulation::spawn(&params).expect("valid params");
        assert_eq!(a.len(), 500);
        assert_eq!(a.as_slice(), b.as_slice());

        let area = Bounds::from_center(params.world_center, 50.0);
        assert!(a.positions().all(|p| area.contains(p)));
        assert!(a.iter().all(|agent| agent.velocity == Vec2::ZERO && agent.drag == params.drag));
    }

    #[test]
    fn spawn_with_zero_extent_stacks_agents_on_center() {
        let params = SimulationParams {
            num_agents: 3,
            spawn_half_extent: 0.0,
            ..SimulationParams::default()
        };
        let population = AgentPopulation::spawn(&params).expect("valid params");
        assert!(population.positions().all(|p| p == Vec2::ZERO));
    }
}
