//! BTS antenna registry persistence operations.

use anyhow::Result;
use chrono::NaiveDate;
use qosmap_core::AntennaSite;
use sqlx::SqlitePool;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Load the full antenna registry, ordered by wilaya then commune.
pub async fn list_antennas(pool: &SqlitePool) -> Result<Vec<AntennaSite>> {
    let rows = sqlx::query_as::<_, AntennaRow>(
        "SELECT id, nom, wilaya, commune, latitude, longitude, \
         cell_id_A AS cell_id_a, cell_id_B AS cell_id_b, cell_id_C AS cell_id_c, \
         date_installation FROM bts_antennas ORDER BY wilaya, commune",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(AntennaSite::from).collect())
}

/// Insert an antenna site; returns the generated row id.
pub async fn insert_antenna(pool: &SqlitePool, site: &AntennaSite) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO bts_antennas (
            nom, wilaya, commune, latitude, longitude,
            cell_id_A, cell_id_B, cell_id_C, date_installation
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&site.name)
    .bind(&site.wilaya)
    .bind(&site.commune)
    .bind(site.latitude)
    .bind(site.longitude)
    .bind(&site.cell_id_a)
    .bind(&site.cell_id_b)
    .bind(&site.cell_id_c)
    .bind(site.installed_on.map(|d| d.format(DATE_FORMAT).to_string()))
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct AntennaRow {
    id: i64,
    nom: String,
    wilaya: String,
    commune: String,
    latitude: f64,
    longitude: f64,
    cell_id_a: String,
    cell_id_b: String,
    cell_id_c: String,
    date_installation: Option<String>,
}

impl From<AntennaRow> for AntennaSite {
    fn from(row: AntennaRow) -> Self {
        // The install date is informational only; an unparsable value is
        // dropped rather than failing the whole registry load.
        let installed_on = row
            .date_installation
            .as_deref()
            .and_then(|raw| NaiveDate::parse_from_str(raw, DATE_FORMAT).ok());

        AntennaSite {
            id: row.id,
            name: row.nom,
            wilaya: row.wilaya,
            commune: row.commune,
            latitude: row.latitude,
            longitude: row.longitude,
            cell_id_a: row.cell_id_a,
            cell_id_b: row.cell_id_b,
            cell_id_c: row.cell_id_c,
            installed_on,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;

    fn site(name: &str, wilaya: &str, commune: &str) -> AntennaSite {
        AntennaSite {
            id: 0,
            name: name.to_string(),
            wilaya: wilaya.to_string(),
            commune: commune.to_string(),
            latitude: 36.75,
            longitude: 3.05,
            cell_id_a: format!("{name}-A"),
            cell_id_b: format!("{name}-B"),
            cell_id_c: format!("{name}-C"),
            installed_on: NaiveDate::from_ymd_opt(2019, 6, 1),
        }
    }

    #[tokio::test]
    async fn insert_and_list_ordered_by_location() {
        let db = init_database(":memory:", 1).await.unwrap();

        insert_antenna(db.pool(), &site("BTS-ORA-001", "Oran", "Arzew"))
            .await
            .unwrap();
        insert_antenna(db.pool(), &site("BTS-ALG-001", "Alger", "Hydra"))
            .await
            .unwrap();

        let all = list_antennas(db.pool()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].wilaya, "Alger");
        assert_eq!(all[1].wilaya, "Oran");
        assert!(all[0].id > 0);
        assert_eq!(all[0].cell_id_b, "BTS-ALG-001-B");
        assert_eq!(all[0].installed_on, NaiveDate::from_ymd_opt(2019, 6, 1));
    }
}
