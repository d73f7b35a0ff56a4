//! Planning orchestration
//!
//! Validates a planning request, clusters the points per team, routes every
//! non-empty cluster and issues tournée references. Validated days are turned
//! into journée records and handed to the store.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::defaults::{
    default_depot, AVERAGE_SPEED_KMH, HANDLING_MINUTES_PER_STOP, JOURNEE_PADDING, JOURNEE_PREFIX,
    MAX_PER_CLUSTER, TOURNEE_PADDING, TOURNEE_PREFIX,
};
use crate::error::PlanningError;
use crate::services::clustering::{self, cluster_sizes, distribute_evenly, ConstrainedKMeans, KMeansConfig};
use crate::services::references::{next_reference, ReferenceSequence};
use crate::services::route_assembler::{AssembledRoute, ClusterInput, RouteAssembler};
use crate::services::routing::{DistanceEstimator, RoutingOptimizer};
use crate::services::store::JourneeStore;
use crate::types::{
    ClusteringReport, Coordinates, DaySummary, DeliveryPoint, Journee, PlanTotals, PlanningOutcome,
    PlanningRequest, Strategy, Tournee,
};

/// Planning parameters
#[derive(Debug, Clone)]
pub struct PlanningConfig {
    /// Used when a request carries no depot
    pub depot: Coordinates,
    /// Points per team ceiling
    pub max_per_cluster: usize,
    /// Clusters routed at the same time (1 = one after the other)
    pub route_concurrency: usize,
    pub average_speed_kmh: f64,
    pub handling_minutes_per_stop: f64,
    pub kmeans: KMeansConfig,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            depot: default_depot(),
            max_per_cluster: MAX_PER_CLUSTER,
            route_concurrency: 1,
            average_speed_kmh: AVERAGE_SPEED_KMH,
            handling_minutes_per_stop: HANDLING_MINUTES_PER_STOP,
            kmeans: KMeansConfig::default(),
        }
    }
}

/// Even split of the request's points over its teams
pub fn suggest_desired_sizes(request: &PlanningRequest) -> Vec<usize> {
    distribute_evenly(request.points.len(), request.teams.len())
}

pub struct PlanningOrchestrator {
    kmeans: ConstrainedKMeans,
    assembler: RouteAssembler,
    store: Arc<dyn JourneeStore>,
    config: PlanningConfig,
}

impl PlanningOrchestrator {
    pub fn new(
        optimizer: Arc<dyn RoutingOptimizer>,
        distance: Arc<dyn DistanceEstimator>,
        store: Arc<dyn JourneeStore>,
        config: PlanningConfig,
    ) -> Self {
        let assembler = RouteAssembler::new(optimizer, distance)
            .with_timing(config.average_speed_kmh, config.handling_minutes_per_stop);

        Self {
            kmeans: ConstrainedKMeans::new(config.kmeans.clone()),
            assembler,
            store,
            config,
        }
    }

    /// Check a request before any clustering or routing work
    pub fn validate(&self, request: &PlanningRequest) -> Result<(), PlanningError> {
        let teams = request.teams.len();
        if teams == 0 {
            return Err(PlanningError::NoTeams);
        }
        if request.vehicles.len() != teams {
            return Err(PlanningError::VehicleCountMismatch {
                teams,
                vehicles: request.vehicles.len(),
            });
        }

        if request.strategy == Strategy::Custom {
            let desired = request
                .desired_sizes
                .as_ref()
                .ok_or(PlanningError::MissingDesiredSizes)?;

            if desired.len() != teams {
                return Err(PlanningError::DesiredSizesLength {
                    expected: teams,
                    actual: desired.len(),
                });
            }

            let sum: usize = desired.iter().sum();
            if sum != request.points.len() {
                return Err(PlanningError::DesiredSizesSum {
                    expected: request.points.len(),
                    actual: sum,
                });
            }

            if let Some((cluster, &size)) = desired
                .iter()
                .enumerate()
                .find(|(_, size)| **size > self.config.max_per_cluster)
            {
                return Err(PlanningError::CeilingExceeded {
                    cluster,
                    size,
                    ceiling: self.config.max_per_cluster,
                });
            }
        }

        Ok(())
    }

    /// Split the request's points into priced tournées, one per non-empty cluster
    pub async fn plan(&self, request: &PlanningRequest) -> Result<PlanningOutcome, PlanningError> {
        self.validate(request)?;

        let k = request.teams.len();
        info!(
            "Planning {} points for {} teams ({:?} strategy)",
            request.points.len(),
            k,
            request.strategy
        );

        let desired = match request.strategy {
            Strategy::Custom => request.desired_sizes.clone().unwrap_or_default(),
            Strategy::Balanced => Vec::new(),
        };
        let capacities = match request.strategy {
            Strategy::Custom => desired.clone(),
            Strategy::Balanced => vec![self.config.max_per_cluster; k],
        };

        let coords: Vec<Coordinates> = request.points.iter().map(DeliveryPoint::coordinates).collect();
        let outcome = self.kmeans.cluster(&coords, &capacities);
        let assignment = clustering::rebalance(request.strategy, &coords, &outcome.assignment, k, &desired);
        let sizes = cluster_sizes(&assignment, k);
        debug!("Cluster sizes after rebalancing: {:?}", sizes);

        let mut unassigned_point_ids: Vec<String> = request
            .points
            .iter()
            .zip(&assignment)
            .filter(|(_, cluster)| cluster.is_none())
            .map(|(p, _)| p.id.clone())
            .collect();

        let mut groups: Vec<Vec<DeliveryPoint>> = vec![Vec::new(); k];
        for (point, cluster) in request.points.iter().zip(&assignment) {
            if let Some(j) = *cluster {
                groups[j].push(point.clone());
            }
        }

        let inputs: Vec<ClusterInput> = groups
            .into_iter()
            .enumerate()
            .filter(|(_, points)| !points.is_empty())
            .map(|(cluster, points)| ClusterInput {
                cluster,
                points,
                team: request.teams[cluster].clone(),
                vehicle: request.vehicles[cluster].clone(),
            })
            .collect();

        let depot = request.depot.unwrap_or(self.config.depot);
        let pending: Vec<_> = inputs
            .iter()
            .map(|input| self.assembler.assemble(input, depot))
            .collect();
        let routes: Vec<Option<AssembledRoute>> = stream::iter(pending)
            .buffered(self.config.route_concurrency.max(1))
            .collect()
            .await;

        // Points the optimizer left out of an otherwise usable route
        unassigned_point_ids.extend(
            routes
                .iter()
                .flatten()
                .flat_map(|route| route.undelivered_point_ids.iter().cloned()),
        );

        let skipped_clusters: Vec<usize> = inputs
            .iter()
            .zip(&routes)
            .filter(|(_, route)| route.is_none())
            .map(|(input, _)| input.cluster)
            .collect();

        let existing = self.store.existing_references(TOURNEE_PREFIX).await?;
        let mut sequence = ReferenceSequence::new(TOURNEE_PREFIX, TOURNEE_PADDING, &existing);
        let tournees: Vec<Tournee> = routes
            .into_iter()
            .flatten()
            .map(|route| route.into_tournee(sequence.issue()))
            .collect();

        let totals = PlanTotals::from_tournees(&tournees);

        if !skipped_clusters.is_empty() {
            warn!("No route for clusters {:?}", skipped_clusters);
        }
        info!(
            "Planned {} tournées: {:.1} km, cost {}",
            tournees.len(),
            totals.total_distance_km,
            totals.total_cost
        );

        Ok(PlanningOutcome {
            tournees,
            totals,
            clustering: ClusteringReport {
                iterations: outcome.iterations,
                converged: outcome.converged,
                cluster_sizes: sizes,
            },
            unassigned_point_ids,
            skipped_clusters,
        })
    }

    /// Persist the tournées of `date` as a journée.
    ///
    /// Tournées whose reference is missing, already persisted or repeated in
    /// the batch get a fresh one.
    pub async fn validate_day(
        &self,
        tournees: Vec<Tournee>,
        date: NaiveDate,
        planner_email: &str,
    ) -> Result<Journee, PlanningError> {
        if self.day_exists(date).await? {
            return Err(PlanningError::DayAlreadyPlanned(date));
        }

        let existing_journees = self.store.existing_references(JOURNEE_PREFIX).await?;
        let reference = next_reference(JOURNEE_PREFIX, JOURNEE_PADDING, &existing_journees);

        let persisted: HashSet<String> = self
            .store
            .existing_references(TOURNEE_PREFIX)
            .await?
            .into_iter()
            .collect();
        let known: Vec<&str> = persisted
            .iter()
            .map(String::as_str)
            .chain(tournees.iter().map(|t| t.reference.as_str()))
            .collect();
        let mut sequence = ReferenceSequence::new(TOURNEE_PREFIX, TOURNEE_PADDING, &known);

        let mut seen: HashSet<String> = HashSet::new();
        let tournees: Vec<Tournee> = tournees
            .into_iter()
            .map(|mut t| {
                if t.reference.is_empty()
                    || persisted.contains(&t.reference)
                    || seen.contains(&t.reference)
                {
                    let fresh = sequence.issue();
                    debug!("Tournée {:?} renumbered {}", t.reference, fresh);
                    t.reference = fresh;
                }
                seen.insert(t.reference.clone());
                t.journee_reference = reference.clone();
                t
            })
            .collect();

        let total_cost = tournees.iter().map(|t| t.cost).sum();
        let journee = Journee {
            reference,
            date,
            planner_email: planner_email.to_string(),
            total_cost,
            tournees,
        };

        self.store.save(&journee).await?;

        info!(
            "Journée {} validated for {} by {} ({} tournées, cost {})",
            journee.reference,
            date,
            planner_email,
            journee.tournees.len(),
            journee.total_cost
        );

        Ok(journee)
    }

    /// Persisted journée of `date` with per-team figures
    pub async fn load_day(&self, date: NaiveDate) -> Result<Option<DaySummary>, PlanningError> {
        let journee = self.store.find_by_date(date).await?;
        Ok(journee.map(DaySummary::from_journee))
    }

    pub async fn day_exists(&self, date: NaiveDate) -> Result<bool, PlanningError> {
        Ok(self.store.find_by_date(date).await?.is_some())
    }

    /// Points not yet part of any persisted tournée
    pub async fn remaining_points(
        &self,
        points: Vec<DeliveryPoint>,
    ) -> Result<Vec<DeliveryPoint>, PlanningError> {
        let planned: HashSet<String> = self.store.planned_point_ids().await?.into_iter().collect();
        let total = points.len();
        let remaining: Vec<DeliveryPoint> = points
            .into_iter()
            .filter(|p| !planned.contains(&p.id))
            .collect();

        debug!("{} of {} points still to plan", remaining.len(), total);
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::services::routing::{MockRouting, Waypoint};
    use crate::services::store::{JourneyLookup, JourneyPersister, MemoryStore, ReferenceStore};
    use crate::types::{Team, TourneeStatus, Vehicle};

    /// Mock routing that counts calls, fails for one vehicle and can leave
    /// the last job of another vehicle's route out
    #[derive(Default)]
    struct CountingRouting {
        calls: AtomicUsize,
        failing_vehicle: Option<String>,
        partial_vehicle: Option<String>,
    }

    impl CountingRouting {
        fn failing(vehicle: &str) -> Self {
            Self {
                failing_vehicle: Some(vehicle.to_string()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl RoutingOptimizer for CountingRouting {
        async fn optimize(
            &self,
            depot: Coordinates,
            points: &[DeliveryPoint],
            vehicle: &Vehicle,
        ) -> Result<Vec<Waypoint>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_vehicle.as_deref() == Some(vehicle.code.as_str()) {
                anyhow::bail!("no route found for {}", vehicle.code);
            }
            let mut waypoints = MockRouting::new().optimize(depot, points, vehicle).await?;
            if self.partial_vehicle.as_deref() == Some(vehicle.code.as_str()) && waypoints.len() > 2 {
                waypoints.remove(waypoints.len() - 2);
            }
            Ok(waypoints)
        }

        fn name(&self) -> &str {
            "CountingRouting"
        }
    }

    #[async_trait]
    impl DistanceEstimator for CountingRouting {
        async fn distance_km(&self, path: &[Coordinates]) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            MockRouting::new().distance_km(path).await
        }
    }

    /// Store whose every call fails
    struct BrokenStore;

    #[async_trait]
    impl ReferenceStore for BrokenStore {
        async fn existing_references(&self, _: &str) -> Result<Vec<String>> {
            anyhow::bail!("connection refused")
        }
    }

    #[async_trait]
    impl JourneyPersister for BrokenStore {
        async fn save(&self, _: &Journee) -> Result<()> {
            anyhow::bail!("connection refused")
        }
    }

    #[async_trait]
    impl JourneyLookup for BrokenStore {
        async fn find_by_date(&self, _: NaiveDate) -> Result<Option<Journee>> {
            Ok(None)
        }

        async fn planned_point_ids(&self) -> Result<Vec<String>> {
            anyhow::bail!("connection refused")
        }
    }

    impl JourneeStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }
    }

    fn orchestrator_with(
        routing: Arc<CountingRouting>,
        store: Arc<dyn JourneeStore>,
        config: PlanningConfig,
    ) -> PlanningOrchestrator {
        PlanningOrchestrator::new(routing.clone(), routing, store, config)
    }

    fn orchestrator(routing: Arc<CountingRouting>, store: Arc<MemoryStore>) -> PlanningOrchestrator {
        orchestrator_with(routing, store, PlanningConfig::default())
    }

    fn random_points(count: usize, seed: u64) -> Vec<DeliveryPoint> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|i| {
                DeliveryPoint::new(
                    format!("CMD{:04}", i + 1),
                    rng.gen_range(45.05..45.35),
                    rng.gen_range(5.55..5.95),
                )
            })
            .collect()
    }

    fn request(points: Vec<DeliveryPoint>, teams: usize) -> PlanningRequest {
        PlanningRequest {
            points,
            teams: (1..=teams as i64).map(|id| Team { id }).collect(),
            vehicles: (1..=teams)
                .map(|i| Vehicle::new(format!("CAM-{:02}", i), 1.2))
                .collect(),
            strategy: Strategy::Balanced,
            desired_sizes: None,
            depot: None,
        }
    }

    fn custom(mut request: PlanningRequest, desired: Vec<usize>) -> PlanningRequest {
        request.strategy = Strategy::Custom;
        request.desired_sizes = Some(desired);
        request
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[tokio::test]
    async fn test_plan_hundred_points_four_teams() {
        let routing = Arc::new(CountingRouting::default());
        let planner = orchestrator(routing, Arc::new(MemoryStore::new()));

        let outcome = planner.plan(&request(random_points(100, 42), 4)).await.unwrap();

        assert_eq!(outcome.tournees.len(), 4);
        let sizes: Vec<usize> = outcome.tournees.iter().map(|t| t.deliveries()).collect();
        assert!(sizes.iter().all(|&s| s <= MAX_PER_CLUSTER));
        assert!(sizes.iter().max().unwrap() - sizes.iter().min().unwrap() <= 1);
        assert_eq!(sizes.iter().sum::<usize>(), 100);
        assert!(outcome.unassigned_point_ids.is_empty());
        assert!(outcome.skipped_clusters.is_empty());

        let references: Vec<&str> = outcome.tournees.iter().map(|t| t.reference.as_str()).collect();
        assert_eq!(references, vec!["TRN001", "TRN002", "TRN003", "TRN004"]);
        let letters: Vec<&str> = outcome.tournees.iter().map(|t| t.letter.as_str()).collect();
        assert_eq!(letters, vec!["A", "B", "C", "D"]);
        assert!(outcome.tournees.iter().all(|t| t.status == TourneeStatus::Planned));

        let cost: i64 = outcome.tournees.iter().map(|t| t.cost).sum();
        assert_eq!(outcome.totals.total_cost, cost);
        assert!(outcome.totals.total_distance_km > 0.0);
    }

    #[tokio::test]
    async fn test_plan_every_tournee_starts_and_ends_at_depot() {
        let routing = Arc::new(CountingRouting::default());
        let planner = orchestrator(routing, Arc::new(MemoryStore::new()));
        let mut req = request(random_points(12, 3), 3);
        let depot = Coordinates::new(45.2, 5.7);
        req.depot = Some(depot);

        let outcome = planner.plan(&req).await.unwrap();

        for tournee in &outcome.tournees {
            assert_eq!(tournee.path.first(), Some(&depot));
            assert_eq!(tournee.path.last(), Some(&depot));
            assert_eq!(tournee.path.len(), tournee.deliveries() + 2);
        }
    }

    #[tokio::test]
    async fn test_validation_errors_before_any_collaborator_call() {
        let routing = Arc::new(CountingRouting::default());
        let planner = orchestrator(routing.clone(), Arc::new(MemoryStore::new()));
        let points = random_points(10, 1);

        let no_teams = request(points.clone(), 0);
        assert!(matches!(planner.plan(&no_teams).await, Err(PlanningError::NoTeams)));

        let mut mismatch = request(points.clone(), 3);
        mismatch.vehicles.pop();
        assert!(matches!(
            planner.plan(&mismatch).await,
            Err(PlanningError::VehicleCountMismatch { teams: 3, vehicles: 2 })
        ));

        let mut missing = request(points.clone(), 2);
        missing.strategy = Strategy::Custom;
        assert!(matches!(planner.plan(&missing).await, Err(PlanningError::MissingDesiredSizes)));

        let wrong_length = custom(request(points.clone(), 2), vec![10]);
        assert!(matches!(
            planner.plan(&wrong_length).await,
            Err(PlanningError::DesiredSizesLength { expected: 2, actual: 1 })
        ));

        let wrong_sum = custom(request(points.clone(), 2), vec![5, 4]);
        assert!(matches!(
            planner.plan(&wrong_sum).await,
            Err(PlanningError::DesiredSizesSum { expected: 10, actual: 9 })
        ));

        assert_eq!(routing.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_custom_size_above_ceiling_rejected() {
        let routing = Arc::new(CountingRouting::default());
        let planner = orchestrator(routing.clone(), Arc::new(MemoryStore::new()));

        let req = custom(request(random_points(60, 5), 2), vec![55, 5]);
        let err = planner.plan(&req).await.unwrap_err();

        assert!(matches!(err, PlanningError::CeilingExceeded { cluster: 0, size: 55, ceiling: 50 }));
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(routing.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_plan_custom_sizes() {
        let routing = Arc::new(CountingRouting::default());
        let planner = orchestrator(routing, Arc::new(MemoryStore::new()));

        let req = custom(request(random_points(30, 9), 3), vec![5, 15, 10]);
        let outcome = planner.plan(&req).await.unwrap();

        assert_eq!(outcome.clustering.cluster_sizes, vec![5, 15, 10]);
        let sizes: Vec<usize> = outcome.tournees.iter().map(|t| t.deliveries()).collect();
        assert_eq!(sizes, vec![5, 15, 10]);
    }

    #[tokio::test]
    async fn test_failing_cluster_is_skipped() {
        let routing = Arc::new(CountingRouting::failing("CAM-02"));
        let planner = orchestrator(routing, Arc::new(MemoryStore::new()));

        let outcome = planner.plan(&request(random_points(30, 11), 3)).await.unwrap();

        assert_eq!(outcome.skipped_clusters, vec![1]);
        assert_eq!(outcome.tournees.len(), 2);
        assert!(outcome.tournees.iter().all(|t| t.vehicle_code != "CAM-02"));
        // Skipped clusters do not consume a reference
        let references: Vec<&str> = outcome.tournees.iter().map(|t| t.reference.as_str()).collect();
        assert_eq!(references, vec!["TRN001", "TRN002"]);
        let letters: Vec<&str> = outcome.tournees.iter().map(|t| t.letter.as_str()).collect();
        assert_eq!(letters, vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_failing_cluster_is_skipped_with_concurrent_assembly() {
        let routing = Arc::new(CountingRouting::failing("CAM-02"));
        let config = PlanningConfig { route_concurrency: 3, ..Default::default() };
        let planner = orchestrator_with(routing.clone(), Arc::new(MemoryStore::new()), config);

        let outcome = planner.plan(&request(random_points(40, 19), 4)).await.unwrap();

        assert_eq!(outcome.skipped_clusters, vec![1]);
        let letters: Vec<&str> = outcome.tournees.iter().map(|t| t.letter.as_str()).collect();
        assert_eq!(letters, vec!["A", "C", "D"]);
        let references: Vec<&str> = outcome.tournees.iter().map(|t| t.reference.as_str()).collect();
        assert_eq!(references, vec!["TRN001", "TRN002", "TRN003"]);
        // 4 optimizer calls plus 3 distance calls
        assert_eq!(routing.calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_plan_runs_on_spawned_task() {
        let config = PlanningConfig { route_concurrency: 2, ..Default::default() };
        let planner = Arc::new(orchestrator_with(
            Arc::new(CountingRouting::default()),
            Arc::new(MemoryStore::new()),
            config,
        ));
        let req = request(random_points(20, 71), 2);

        let handle = tokio::spawn({
            let planner = planner.clone();
            async move { planner.plan(&req).await }
        });
        let outcome = handle.await.unwrap().unwrap();

        assert_eq!(outcome.tournees.len(), 2);
    }

    #[tokio::test]
    async fn test_points_left_out_of_a_route_are_reported() {
        let routing = Arc::new(CountingRouting {
            partial_vehicle: Some("CAM-01".to_string()),
            ..Default::default()
        });
        let planner = orchestrator(routing, Arc::new(MemoryStore::new()));

        let outcome = planner.plan(&request(random_points(20, 73), 2)).await.unwrap();

        assert_eq!(outcome.unassigned_point_ids.len(), 1);
        let delivered: usize = outcome.tournees.iter().map(|t| t.deliveries()).sum();
        assert_eq!(delivered, 19);
        assert!(outcome
            .tournees
            .iter()
            .all(|t| !t.point_ids.contains(&outcome.unassigned_point_ids[0])));
    }

    #[tokio::test]
    async fn test_oversubscribed_points_are_reported() {
        let routing = Arc::new(CountingRouting::default());
        let config = PlanningConfig { max_per_cluster: 2, ..Default::default() };
        let planner = orchestrator_with(routing, Arc::new(MemoryStore::new()), config);

        let outcome = planner.plan(&request(random_points(5, 13), 2)).await.unwrap();

        assert_eq!(outcome.unassigned_point_ids, vec!["CMD0005"]);
        assert_eq!(outcome.tournees.iter().map(|t| t.deliveries()).sum::<usize>(), 4);
    }

    #[tokio::test]
    async fn test_fewer_points_than_teams() {
        let routing = Arc::new(CountingRouting::default());
        let planner = orchestrator(routing, Arc::new(MemoryStore::new()));

        let outcome = planner.plan(&request(random_points(2, 17), 4)).await.unwrap();

        assert_eq!(outcome.tournees.len(), 2);
        assert!(outcome.skipped_clusters.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_assembly_keeps_cluster_order() {
        let points = random_points(40, 23);

        let sequential = orchestrator(Arc::new(CountingRouting::default()), Arc::new(MemoryStore::new()));
        let config = PlanningConfig { route_concurrency: 3, ..Default::default() };
        let concurrent = orchestrator_with(
            Arc::new(CountingRouting::default()),
            Arc::new(MemoryStore::new()),
            config,
        );

        let a = sequential.plan(&request(points.clone(), 4)).await.unwrap();
        let b = concurrent.plan(&request(points, 4)).await.unwrap();

        assert_eq!(a.tournees, b.tournees);
    }

    #[tokio::test]
    async fn test_plan_references_follow_persisted_ones() {
        let store = Arc::new(MemoryStore::new());
        let planner = orchestrator(Arc::new(CountingRouting::default()), store.clone());

        let first = planner.plan(&request(random_points(20, 29), 2)).await.unwrap();
        planner
            .validate_day(first.tournees, date(20), "planner@example.com")
            .await
            .unwrap();

        let second = planner.plan(&request(random_points(20, 31), 2)).await.unwrap();
        let references: Vec<&str> = second.tournees.iter().map(|t| t.reference.as_str()).collect();
        assert_eq!(references, vec!["TRN003", "TRN004"]);
    }

    #[tokio::test]
    async fn test_plan_store_failure() {
        let planner = orchestrator_with(
            Arc::new(CountingRouting::default()),
            Arc::new(BrokenStore),
            PlanningConfig::default(),
        );

        let err = planner.plan(&request(random_points(6, 37), 2)).await.unwrap_err();
        assert_eq!(err.code(), "STORE_ERROR");
    }

    #[tokio::test]
    async fn test_validate_day_creates_journee() {
        let store = Arc::new(MemoryStore::new());
        let planner = orchestrator(Arc::new(CountingRouting::default()), store.clone());
        let outcome = planner.plan(&request(random_points(20, 41), 2)).await.unwrap();
        let expected_cost = outcome.totals.total_cost;

        let journee = planner
            .validate_day(outcome.tournees, date(21), "planner@example.com")
            .await
            .unwrap();

        assert_eq!(journee.reference, "JRN00000001");
        assert_eq!(journee.total_cost, expected_cost);
        assert!(journee.tournees.iter().all(|t| t.journee_reference == "JRN00000001"));
        assert_eq!(store.len(), 1);
        assert!(planner.day_exists(date(21)).await.unwrap());
        assert!(!planner.day_exists(date(22)).await.unwrap());
    }

    #[tokio::test]
    async fn test_validate_day_twice_is_refused() {
        let store = Arc::new(MemoryStore::new());
        let planner = orchestrator(Arc::new(CountingRouting::default()), store.clone());

        let outcome = planner.plan(&request(random_points(10, 43), 2)).await.unwrap();
        planner
            .validate_day(outcome.tournees.clone(), date(23), "planner@example.com")
            .await
            .unwrap();

        let err = planner
            .validate_day(outcome.tournees, date(23), "planner@example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, PlanningError::DayAlreadyPlanned(d) if d == date(23)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_validate_day_renumbers_taken_references() {
        let store = Arc::new(MemoryStore::new());
        let planner = orchestrator(Arc::new(CountingRouting::default()), store.clone());

        // Both plans are made before either day is validated
        let monday = planner.plan(&request(random_points(10, 47), 2)).await.unwrap();
        let tuesday = planner.plan(&request(random_points(10, 53), 2)).await.unwrap();

        planner.validate_day(monday.tournees, date(26), "a@example.com").await.unwrap();
        let journee = planner
            .validate_day(tuesday.tournees, date(27), "b@example.com")
            .await
            .unwrap();

        assert_eq!(journee.reference, "JRN00000002");
        let references: Vec<&str> = journee.tournees.iter().map(|t| t.reference.as_str()).collect();
        assert_eq!(references, vec!["TRN003", "TRN004"]);
    }

    #[tokio::test]
    async fn test_validate_day_renumbers_repeated_references() {
        let store = Arc::new(MemoryStore::new());
        let planner = orchestrator(Arc::new(CountingRouting::default()), store.clone());

        // Two plans from an empty store both start at TRN001
        let morning = planner.plan(&request(random_points(10, 79), 2)).await.unwrap();
        let afternoon = planner.plan(&request(random_points(10, 83), 2)).await.unwrap();
        let mut tournees = morning.tournees;
        tournees.extend(afternoon.tournees);

        let journee = planner
            .validate_day(tournees, date(30), "planner@example.com")
            .await
            .unwrap();

        let references: Vec<&str> = journee.tournees.iter().map(|t| t.reference.as_str()).collect();
        assert_eq!(references, vec!["TRN001", "TRN002", "TRN003", "TRN004"]);
        let stored = store.existing_references("TRN").await.unwrap();
        assert_eq!(stored.len(), 4);
    }

    #[tokio::test]
    async fn test_validate_day_store_failure() {
        let planner = orchestrator_with(
            Arc::new(CountingRouting::default()),
            Arc::new(BrokenStore),
            PlanningConfig::default(),
        );

        let err = planner
            .validate_day(vec![], date(24), "planner@example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, PlanningError::Store(_)));
    }

    #[tokio::test]
    async fn test_load_day_stats() {
        let store = Arc::new(MemoryStore::new());
        let planner = orchestrator(Arc::new(CountingRouting::default()), store);
        let outcome = planner.plan(&request(random_points(12, 59), 3)).await.unwrap();
        planner
            .validate_day(outcome.tournees, date(25), "planner@example.com")
            .await
            .unwrap();

        let summary = planner.load_day(date(25)).await.unwrap().unwrap();

        assert_eq!(summary.stats.len(), 3);
        assert_eq!(summary.stats.values().map(|s| s.deliveries).sum::<usize>(), 12);
        assert!(planner.load_day(date(28)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remaining_points_excludes_planned() {
        let store = Arc::new(MemoryStore::new());
        let planner = orchestrator(Arc::new(CountingRouting::default()), store);
        let points = random_points(8, 61);

        let outcome = planner.plan(&request(points[..4].to_vec(), 2)).await.unwrap();
        planner
            .validate_day(outcome.tournees, date(29), "planner@example.com")
            .await
            .unwrap();

        let remaining = planner.remaining_points(points.clone()).await.unwrap();
        assert_eq!(remaining, points[4..].to_vec());
    }

    #[test]
    fn test_suggest_desired_sizes() {
        let req = request(random_points(10, 67), 3);
        assert_eq!(suggest_desired_sizes(&req), vec![4, 3, 3]);
    }
}
