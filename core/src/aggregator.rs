// Faculty aggregation
//
// Groups buildings by faculty for the diagram and sums live load across a
// selected faculty.

use crate::data_source::CampusDataSource;
use crate::model::{
    Building, BuildingLoad, CampusSummary, FacultyAggregate, FacultyGroup, FacultyGroups,
};
use crate::{CampusFlowError, Result};
use futures::future::try_join_all;
use tracing::debug;

/// Group buildings by faculty name, unioning each faculty's active sources.
///
/// Faculties keep the order in which they first appear in `buildings`.
/// Buildings without a faculty name land in the `"Other"` group.
pub fn group_by_faculty(buildings: &[Building]) -> FacultyGroups {
    let mut groups = FacultyGroups::new();

    for building in buildings {
        let key = building.faculty_key();
        let group = groups
            .entry(key.to_string())
            .or_insert_with(|| FacultyGroup::new(key));

        group
            .sources
            .extend(building.active_sources.iter().cloned());
        group.buildings.push(building.clone());
    }

    groups
}

/// Sum the current load of every building in `faculty`.
///
/// Returns `Ok(None)` when the faculty has no buildings. Snapshots are fetched
/// concurrently; a single failed fetch fails the whole aggregate.
pub async fn aggregate_faculty(
    faculty: &str,
    buildings: &[Building],
    source: &dyn CampusDataSource,
) -> Result<Option<FacultyAggregate>> {
    let members: Vec<&Building> = buildings
        .iter()
        .filter(|b| b.faculty_key() == faculty)
        .collect();

    if members.is_empty() {
        debug!(target: "aggregator", faculty = %faculty, "No buildings in faculty");
        return Ok(None);
    }

    let snapshots = try_join_all(
        members
            .iter()
            .map(|b| source.get_building_energy_flow(b.id)),
    )
    .await
    .map_err(|e| CampusFlowError::Aggregate(format!("{}: {}", faculty, e)))?;

    let loads: Vec<BuildingLoad> = members
        .iter()
        .zip(snapshots.iter())
        .map(|(building, snapshot)| BuildingLoad {
            id: building.id,
            name: building.name.clone(),
            load: snapshot.total_load,
        })
        .collect();

    let total_load = loads.iter().map(|l| l.load).sum();

    Ok(Some(FacultyAggregate {
        name: faculty.to_string(),
        total_load,
        buildings: loads,
    }))
}

/// Headline counts for the campus overview
pub fn campus_summary(groups: &FacultyGroups, source_count: usize) -> CampusSummary {
    let buildings = groups.values().flat_map(|g| g.buildings.iter());
    let (building_count, unpowered_buildings) =
        buildings.fold((0, 0), |(total, unpowered), b| {
            (
                total + 1,
                unpowered + usize::from(b.active_sources.is_empty()),
            )
        });

    CampusSummary {
        faculty_count: groups.len(),
        building_count,
        source_count,
        unpowered_buildings,
    }
}
