/*
 * src/pipeline/geo_clustering.rs
 *
 * File for the Geographic Clusterer
 *
 * Purpose:
 *   Grid-based clustering of POIs into named districts (spec.md §4.2),
 *   grounded on `original_source/src/application/geo_clustering.py`
 *   field-for-field: 111 km/degree latitude, `111*cos(lat)` km/degree
 *   longitude, Manhattan grid-distance merge order, district naming
 *   `"District {letter} ({top category})"`.
 *
 * Include:
 *   cluster_pois - districts{id->District}, hotel_district_id, city center
 */

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::domain::district::{ClusteringResult, District};
use crate::domain::poi::POICandidate;
use crate::pipeline::scoring::haversine_km;

const KM_PER_LAT_DEGREE: f64 = 111.0;

type Cell = (i64, i64);

fn km_per_lon_degree(lat: f64) -> f64 {
	KM_PER_LAT_DEGREE * lat.to_radians().cos()
}

fn to_grid_cell(lat: f64, lon: f64, cell_size_km: f64) -> Cell {
	let cell_lat = (lat * KM_PER_LAT_DEGREE / cell_size_km).floor() as i64;
	let cell_lon = (lon * km_per_lon_degree(lat) / cell_size_km).floor() as i64;
	(cell_lat, cell_lon)
}

fn grid_distance(a: Cell, b: Cell) -> i64 {
	(a.0 - b.0).abs() + (a.1 - b.1).abs()
}

fn merge_small_cells(mut cells: BTreeMap<Cell, Vec<POICandidate>>, min_pois: usize) -> BTreeMap<Cell, Vec<POICandidate>> {
	let small: Vec<Cell> = cells.iter().filter(|(_, v)| v.len() < min_pois).map(|(k, _)| *k).collect();
	if small.is_empty() {
		return cells;
	}
	let large: Vec<Cell> = cells.iter().filter(|(_, v)| v.len() >= min_pois).map(|(k, _)| *k).collect();
	if large.is_empty() {
		return cells;
	}

	for small_cell in small {
		let nearest = *large.iter().min_by_key(|c| grid_distance(**c, small_cell)).unwrap();
		let pois = cells.remove(&small_cell).unwrap_or_default();
		cells.get_mut(&nearest).unwrap().extend(pois);
	}
	cells
}

fn merge_smallest_cell(mut cells: BTreeMap<Cell, Vec<POICandidate>>) -> BTreeMap<Cell, Vec<POICandidate>> {
	if cells.len() <= 1 {
		return cells;
	}
	let smallest = *cells.iter().min_by_key(|(_, v)| v.len()).unwrap().0;
	let nearest = *cells
		.keys()
		.filter(|c| **c != smallest)
		.min_by_key(|c| grid_distance(**c, smallest))
		.unwrap();
	let pois = cells.remove(&smallest).unwrap_or_default();
	cells.get_mut(&nearest).unwrap().extend(pois);
	cells
}

fn district_name(index: usize, category_counts: &std::collections::BTreeMap<String, u32>) -> String {
	let letter = (b'A' + index as u8) as char;
	match category_counts.iter().max_by_key(|(_, count)| **count) {
		Some((top, _)) => format!("District {letter} ({top})"),
		None => format!("District {letter}"),
	}
}

/// Clusters POIs into districts labeled A, B, C, ... (spec.md §4.2).
/// Deterministic given the same POI list, city center, and parameters.
pub fn cluster_pois(
	pois: &[POICandidate],
	cell_size_km: f64,
	min_pois_per_district: usize,
	max_districts: usize,
	hotel: Option<(f64, f64)>,
	city_center: Option<(f64, f64)>,
) -> ClusteringResult {
	let valid: Vec<POICandidate> = pois.iter().filter(|p| p.has_coords()).cloned().collect();
	if valid.is_empty() {
		warn!("no POIs with valid coordinates for clustering");
		return ClusteringResult::default();
	}

	info!(count = valid.len(), cell_size_km, "clustering POIs");

	let mut cells: BTreeMap<Cell, Vec<POICandidate>> = BTreeMap::new();
	for poi in &valid {
		let (lat, lon) = poi.coords().unwrap();
		cells.entry(to_grid_cell(lat, lon, cell_size_km)).or_default().push(poi.clone());
	}
	debug!(cells = cells.len(), "initial grid cells");

	cells = merge_small_cells(cells, min_pois_per_district);
	while cells.len() > max_districts {
		cells = merge_smallest_cell(cells);
	}
	info!(districts = cells.len(), "final districts");

	let mut districts: BTreeMap<String, District> = BTreeMap::new();
	for (idx, (_, cell_pois)) in cells.into_iter().enumerate() {
		let avg_lat = cell_pois.iter().map(|p| p.lat.unwrap()).sum::<f64>() / cell_pois.len() as f64;
		let avg_lon = cell_pois.iter().map(|p| p.lon.unwrap()).sum::<f64>() / cell_pois.len() as f64;
		let id = ((b'A' + idx as u8) as char).to_string();

		let mut district = District::new(id.clone(), (avg_lat, avg_lon));
		for poi in cell_pois {
			district.add_poi(poi);
		}
		district.name = district_name(idx, &district.category_counts);
		districts.insert(id, district);
	}

	let hotel_district_id = hotel.and_then(|(hlat, hlon)| {
		districts
			.values()
			.min_by(|a, b| {
				haversine_km(hlat, hlon, a.center.0, a.center.1)
					.partial_cmp(&haversine_km(hlat, hlon, b.center.0, b.center.1))
					.unwrap()
			})
			.map(|d| d.id.clone())
	});

	if let Some(id) = &hotel_district_id {
		info!(district = %id, "hotel district identified");
	}

	ClusteringResult { districts, hotel_district_id, city_center }
}

#[cfg(test)]
mod tests {
	use super::*;
	use uuid::Uuid;

	fn poi(lat: f64, lon: f64) -> POICandidate {
		POICandidate {
			poi_id: Uuid::new_v4(),
			name: "P".into(),
			category: "museum".into(),
			tags: vec![],
			rating: Some(4.5),
			user_ratings_total: Some(10),
			price_level: None,
			business_status: None,
			open_now: None,
			address: None,
			lat: Some(lat),
			lon: Some(lon),
			description: None,
			reviews: vec![],
			rank_score: 1.0,
		}
	}

	#[test]
	fn single_cluster_when_close_together() {
		let pois = vec![poi(48.8566, 2.3522), poi(48.8570, 2.3530), poi(48.8560, 2.3510)];
		let result = cluster_pois(&pois, 2.0, 1, 8, None, None);
		assert_eq!(result.districts.len(), 1);
		assert_eq!(result.districts.values().next().unwrap().total_pois, 3);
	}

	#[test]
	fn multiple_clusters_for_distant_points() {
		let pois = vec![poi(48.88, 2.35), poi(48.83, 2.35), poi(48.855, 2.40)];
		let result = cluster_pois(&pois, 1.0, 1, 8, None, None);
		assert!(result.districts.len() >= 2, "expected >=2 districts, got {}", result.districts.len());
	}

	#[test]
	fn district_ids_are_contiguous_alphabet_prefix() {
		let pois: Vec<POICandidate> = (0..20).map(|i| poi(48.80 + i as f64 * 0.01, 2.30 + i as f64 * 0.01)).collect();
		let result = cluster_pois(&pois, 0.5, 1, 8, None, None);
		let mut ids: Vec<&String> = result.districts.keys().collect();
		ids.sort();
		for (i, id) in ids.iter().enumerate() {
			assert_eq!(**id, ((b'A' + i as u8) as char).to_string());
		}
	}

	#[test]
	fn clustering_is_deterministic() {
		let pois = vec![poi(48.88, 2.35), poi(48.83, 2.35), poi(48.855, 2.40), poi(48.84, 2.36)];
		let a = cluster_pois(&pois, 1.0, 1, 8, Some((48.86, 2.35)), Some((48.86, 2.35)));
		let b = cluster_pois(&pois, 1.0, 1, 8, Some((48.86, 2.35)), Some((48.86, 2.35)));
		assert_eq!(a.districts.len(), b.districts.len());
		assert_eq!(a.hotel_district_id, b.hotel_district_id);
	}

	#[test]
	fn hotel_district_is_nearest_to_hotel() {
		let pois = vec![poi(48.88, 2.35), poi(48.83, 2.35)];
		let result = cluster_pois(&pois, 1.0, 1, 8, Some((48.881, 2.351)), None);
		let hotel_district = result.get(result.hotel_district_id.as_ref().unwrap()).unwrap();
		assert!((hotel_district.center.0 - 48.88).abs() < 0.01);
	}
}
