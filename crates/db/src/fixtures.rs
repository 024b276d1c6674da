use tracing::info;

use crate::DbPool;

/// One row of the demo fleet. Rates are decimal strings exactly as the
/// equipment table stores them.
struct SeedUnit {
    equipment_id: &'static str,
    name: &'static str,
    category: &'static str,
    daily_rate: &'static str,
    max_rate: &'static str,
    status: &'static str,
    operator_cert_required: &'static str,
    min_insurance: &'static str,
    storage_location: &'static str,
    weight_class: &'static str,
}

/// Deterministic ten-unit fleet covering the cases callers hit: units with
/// negotiation headroom, one listed at its ceiling, and units already out
/// on rent or in the shop.
const SEED_FLEET: &[SeedUnit] = &[
    SeedUnit {
        equipment_id: "EQ001",
        name: "Bobcat S650 Skid Steer",
        category: "Skid Steer",
        daily_rate: "450",
        max_rate: "550",
        status: "AVAILABLE",
        operator_cert_required: "None",
        min_insurance: "250000",
        storage_location: "Yard A",
        weight_class: "1-2 tons",
    },
    SeedUnit {
        equipment_id: "EQ002",
        name: "CAT 259D Compact Track Loader",
        category: "Skid Steer",
        daily_rate: "520",
        max_rate: "640",
        status: "AVAILABLE",
        operator_cert_required: "None",
        min_insurance: "250000",
        storage_location: "Yard A",
        weight_class: "1-2 tons",
    },
    SeedUnit {
        equipment_id: "EQ003",
        name: "JLG 450AJ Boom Lift",
        category: "Aerial Lift",
        daily_rate: "780",
        max_rate: "920",
        status: "RENTED",
        operator_cert_required: "Aerial Lift",
        min_insurance: "500000",
        storage_location: "Yard B",
        weight_class: "5-7 tons",
    },
    SeedUnit {
        equipment_id: "EQ004",
        name: "Genie S-65 Boom Lift",
        category: "Aerial Lift",
        daily_rate: "800",
        max_rate: "950",
        status: "AVAILABLE",
        operator_cert_required: "Aerial Lift",
        min_insurance: "500000",
        storage_location: "Yard B",
        weight_class: "5-7 tons",
    },
    SeedUnit {
        equipment_id: "EQ005",
        name: "CAT D5 Dozer",
        category: "Dozer",
        daily_rate: "1900",
        max_rate: "2300",
        status: "MAINTENANCE",
        operator_cert_required: "Heavy Equipment",
        min_insurance: "1000000",
        storage_location: "Yard C",
        weight_class: "13-15 tons",
    },
    SeedUnit {
        equipment_id: "EQ006",
        name: "Komatsu PC210 Excavator",
        category: "Excavator",
        daily_rate: "2050",
        max_rate: "2400",
        status: "AVAILABLE",
        operator_cert_required: "Heavy Equipment",
        min_insurance: "1000000",
        storage_location: "Yard C",
        weight_class: "21-23 tons",
    },
    SeedUnit {
        equipment_id: "EQ007",
        name: "CAT 938M Wheel Loader",
        category: "Wheel Loader",
        daily_rate: "1600",
        max_rate: "1900",
        status: "AVAILABLE",
        operator_cert_required: "Heavy Equipment",
        min_insurance: "750000",
        storage_location: "Yard C",
        weight_class: "15-17 tons",
    },
    SeedUnit {
        equipment_id: "EQ008",
        name: "CAT 320 Excavator",
        category: "Excavator",
        daily_rate: "2200",
        max_rate: "2600",
        status: "AVAILABLE",
        operator_cert_required: "Heavy Equipment",
        min_insurance: "1000000",
        storage_location: "Yard A",
        weight_class: "20-25 tons",
    },
    SeedUnit {
        equipment_id: "EQ009",
        name: "Volvo EC220E Excavator",
        category: "Excavator",
        daily_rate: "2150",
        max_rate: "2500",
        status: "AVAILABLE",
        operator_cert_required: "Heavy Equipment",
        min_insurance: "1000000",
        storage_location: "Yard B",
        weight_class: "22-24 tons",
    },
    // Listed at its ceiling: negotiation has no room on this unit.
    SeedUnit {
        equipment_id: "EQ010",
        name: "Grove RT550E Rough Terrain Crane",
        category: "Crane",
        daily_rate: "3200",
        max_rate: "3200",
        status: "AVAILABLE",
        operator_cert_required: "Crane Operator",
        min_insurance: "2000000",
        storage_location: "Yard D",
        weight_class: "30-35 tons",
    },
];

#[derive(Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub inserted: usize,
    pub available: usize,
}

/// Load the demo fleet, replacing any prior seed rows with the same ids.
pub async fn seed_fleet(pool: &DbPool) -> Result<SeedSummary, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut available = 0usize;

    for unit in SEED_FLEET {
        sqlx::query(
            "INSERT INTO equipment (equipment_id, name, category, daily_rate, max_rate,
                                    status, operator_cert_required, min_insurance,
                                    storage_location, weight_class)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(equipment_id) DO UPDATE SET
                 name = excluded.name,
                 category = excluded.category,
                 daily_rate = excluded.daily_rate,
                 max_rate = excluded.max_rate,
                 status = excluded.status,
                 operator_cert_required = excluded.operator_cert_required,
                 min_insurance = excluded.min_insurance,
                 storage_location = excluded.storage_location,
                 weight_class = excluded.weight_class",
        )
        .bind(unit.equipment_id)
        .bind(unit.name)
        .bind(unit.category)
        .bind(unit.daily_rate)
        .bind(unit.max_rate)
        .bind(unit.status)
        .bind(unit.operator_cert_required)
        .bind(unit.min_insurance)
        .bind(unit.storage_location)
        .bind(unit.weight_class)
        .execute(&mut *tx)
        .await?;

        if unit.status == "AVAILABLE" {
            available += 1;
        }
    }

    tx.commit().await?;

    let summary = SeedSummary { inserted: SEED_FLEET.len(), available };
    info!(inserted = summary.inserted, available = summary.available, "seeded demo fleet");
    Ok(summary)
}
