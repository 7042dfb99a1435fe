//! Synthetic user population.
//!
//! Users are generated once, before any daily activity, in id order.
//! Per user the draw order is fixed: age, gender, location, device, network.

use crate::{
    config::{GeneratorConfig, WeightedCategory},
    model::User,
    rng::SimRng,
    types::UserId,
};

pub struct PopulationGenerator<'a> {
    config: &'a GeneratorConfig,
}

impl<'a> PopulationGenerator<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn generate(&self, rng: &mut SimRng) -> Vec<User> {
        let n = self.config.n_users;
        let users: Vec<User> = (0..n).map(|id| self.generate_user(id, rng)).collect();
        log::info!("population: generated {} users", users.len());
        users
    }

    fn generate_user(&self, user_id: UserId, rng: &mut SimRng) -> User {
        let age = rng.uniform_int(self.config.age_min, self.config.age_max);
        let gender = pick_category(&self.config.genders, rng);
        let location = self.pick_location(rng);
        let device = pick_category(&self.config.devices, rng);
        let network = pick_category(&self.config.networks, rng);

        User {
            user_id,
            age,
            gender,
            location,
            device,
            network,
        }
    }

    fn pick_location(&self, rng: &mut SimRng) -> String {
        let locations = &self.config.locations;
        let idx = rng.next_u64_below(locations.len() as u64) as usize;
        locations[idx].clone()
    }
}

/// Probability-weighted pick from a validated category list.
pub fn pick_category(categories: &[WeightedCategory], rng: &mut SimRng) -> String {
    let weights: Vec<f64> = categories.iter().map(|c| c.weight).collect();
    categories[rng.pick_weighted(&weights)].label.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_contiguous_from_zero() {
        let config = GeneratorConfig::default_test();
        let mut rng = SimRng::new(config.seed);
        let users = PopulationGenerator::new(&config).generate(&mut rng);
        assert_eq!(users.len(), 50);
        for (i, u) in users.iter().enumerate() {
            assert_eq!(u.user_id as usize, i);
        }
    }

    #[test]
    fn fields_come_from_configured_catalogs() {
        let config = GeneratorConfig::default();
        let mut rng = SimRng::new(1);
        let users = PopulationGenerator::new(&config).generate(&mut rng);
        for u in &users {
            assert!((18..65).contains(&u.age), "age {} out of range", u.age);
            assert!(config.locations.contains(&u.location));
            assert!(config.genders.iter().any(|g| g.label == u.gender));
            assert!(config.devices.iter().any(|d| d.label == u.device));
            assert!(config.networks.iter().any(|n| n.label == u.network));
        }
    }
}
