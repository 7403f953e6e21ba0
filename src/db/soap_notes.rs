//! SOAP note queries

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, SqlitePool};

use crate::error::{ApiError, ApiResult};
use crate::models::SoapNote;
use crate::pagination::Pagination;

/// Payload for POST /api/soap
#[derive(Debug, Deserialize)]
pub struct NewSoapNote {
    pub student_id: i64,
    pub session_id: Option<i64>,
    pub session_date: NaiveDate,
    pub subjective: Option<String>,
    pub objective: Option<String>,
    pub assessment: Option<String>,
    pub plan: Option<String>,
    pub clinician_signature: Option<String>,
}

/// Partial payload for PUT /api/soap/:id
#[derive(Debug, Default, Deserialize)]
pub struct SoapNotePatch {
    pub session_id: Option<i64>,
    pub session_date: Option<NaiveDate>,
    pub subjective: Option<String>,
    pub objective: Option<String>,
    pub assessment: Option<String>,
    pub plan: Option<String>,
    pub clinician_signature: Option<String>,
}

/// List filters for GET /api/soap
#[derive(Debug, Default)]
pub struct SoapNoteFilter {
    pub student_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub anonymized: Option<bool>,
}

fn push_filters(qb: &mut QueryBuilder<'_, sqlx::Sqlite>, filter: &SoapNoteFilter) {
    if let Some(student_id) = filter.student_id {
        qb.push(" AND student_id = ").push_bind(student_id);
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND session_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND session_date <= ").push_bind(end);
    }
    if let Some(anonymized) = filter.anonymized {
        qb.push(" AND anonymized = ").push_bind(anonymized);
    }
}

pub async fn count(pool: &SqlitePool, filter: &SoapNoteFilter) -> ApiResult<i64> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM soap_notes WHERE 1=1");
    push_filters(&mut qb, filter);
    let total: i64 = qb.build_query_scalar().fetch_one(pool).await?;
    Ok(total)
}

pub async fn list(
    pool: &SqlitePool,
    filter: &SoapNoteFilter,
    page: &Pagination,
) -> ApiResult<Vec<SoapNote>> {
    let mut qb = QueryBuilder::new("SELECT * FROM soap_notes WHERE 1=1");
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY session_date DESC LIMIT ")
        .push_bind(page.per_page)
        .push(" OFFSET ")
        .push_bind(page.offset);
    let notes = qb.build_query_as::<SoapNote>().fetch_all(pool).await?;
    Ok(notes)
}

pub async fn list_for_student(
    pool: &SqlitePool,
    student_id: i64,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> ApiResult<Vec<SoapNote>> {
    let filter = SoapNoteFilter {
        student_id: Some(student_id),
        start_date,
        end_date,
        anonymized: None,
    };
    let mut qb = QueryBuilder::new("SELECT * FROM soap_notes WHERE 1=1");
    push_filters(&mut qb, &filter);
    qb.push(" ORDER BY session_date DESC");
    let notes = qb.build_query_as::<SoapNote>().fetch_all(pool).await?;
    Ok(notes)
}

pub async fn get(pool: &SqlitePool, id: i64) -> ApiResult<SoapNote> {
    sqlx::query_as::<_, SoapNote>("SELECT * FROM soap_notes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("SOAP note {} not found", id)))
}

pub async fn insert(pool: &SqlitePool, new: &NewSoapNote) -> ApiResult<SoapNote> {
    let now = Utc::now();
    let note = sqlx::query_as::<_, SoapNote>(
        r#"
        INSERT INTO soap_notes (
            student_id, session_id, session_date, subjective, objective,
            assessment, plan, clinician_signature, anonymized, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new.student_id)
    .bind(new.session_id)
    .bind(new.session_date)
    .bind(&new.subjective)
    .bind(&new.objective)
    .bind(&new.assessment)
    .bind(&new.plan)
    .bind(&new.clinician_signature)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(note)
}

pub async fn update(pool: &SqlitePool, id: i64, patch: &SoapNotePatch) -> ApiResult<SoapNote> {
    let current = get(pool, id).await?;

    let session_id = patch.session_id.or(current.session_id);
    let session_date = patch.session_date.unwrap_or(current.session_date);
    let subjective = patch.subjective.as_ref().or(current.subjective.as_ref());
    let objective = patch.objective.as_ref().or(current.objective.as_ref());
    let assessment = patch.assessment.as_ref().or(current.assessment.as_ref());
    let plan = patch.plan.as_ref().or(current.plan.as_ref());
    let signature = patch
        .clinician_signature
        .as_ref()
        .or(current.clinician_signature.as_ref());

    sqlx::query(
        r#"
        UPDATE soap_notes
        SET session_id = ?, session_date = ?, subjective = ?, objective = ?,
            assessment = ?, plan = ?, clinician_signature = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(session_id)
    .bind(session_date)
    .bind(subjective)
    .bind(objective)
    .bind(assessment)
    .bind(plan)
    .bind(signature)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    get(pool, id).await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM soap_notes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("SOAP note {} not found", id)));
    }
    Ok(())
}

/// Documentation counters for GET /api/soap/stats
#[derive(Debug, serde::Serialize)]
pub struct SoapStats {
    pub total_notes: i64,
    pub anonymized_notes: i64,
    /// Notes dated within the last 30 days
    pub recent_notes: i64,
    pub top_students: Vec<StudentNoteCount>,
    pub monthly_distribution: Vec<MonthCount>,
}

#[derive(Debug, serde::Serialize)]
pub struct StudentNoteCount {
    pub student_id: i64,
    pub student_name: String,
    pub note_count: i64,
}

#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct MonthCount {
    pub month: String,
    pub count: i64,
}

pub async fn stats(pool: &SqlitePool) -> ApiResult<SoapStats> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM soap_notes")
        .fetch_one(pool)
        .await?;
    let anonymized: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM soap_notes WHERE anonymized = 1")
            .fetch_one(pool)
            .await?;

    let cutoff = Utc::now().date_naive() - chrono::Duration::days(30);
    let recent: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM soap_notes WHERE session_date >= ?")
        .bind(cutoff)
        .fetch_one(pool)
        .await?;

    // ten most documented students; anonymized ones keep their masked name
    let rows: Vec<(i64, String, String, bool, String, i64)> = sqlx::query_as(
        r#"
        SELECT st.id, st.first_name, st.last_name, st.anonymized, st.anonymous_id,
               COUNT(n.id) AS note_count
        FROM soap_notes n JOIN students st ON st.id = n.student_id
        GROUP BY st.id
        ORDER BY note_count DESC, st.last_name
        LIMIT 10
        "#,
    )
    .fetch_all(pool)
    .await?;
    let top_students = rows
        .into_iter()
        .map(
            |(student_id, first, last, anon, anonymous_id, note_count)| StudentNoteCount {
                student_id,
                student_name: if anon {
                    format!("Student {}", &anonymous_id[..8])
                } else {
                    format!("{} {}", first, last)
                },
                note_count,
            },
        )
        .collect();

    let monthly_distribution = sqlx::query_as::<_, MonthCount>(
        "SELECT strftime('%Y-%m', session_date) AS month, COUNT(*) AS count
         FROM soap_notes GROUP BY month ORDER BY month",
    )
    .fetch_all(pool)
    .await?;

    Ok(SoapStats {
        total_notes: total,
        anonymized_notes: anonymized,
        recent_notes: recent,
        top_students,
        monthly_distribution,
    })
}

/// Replace section text and freeze the note
pub async fn anonymize(pool: &SqlitePool, id: i64) -> ApiResult<SoapNote> {
    let current = get(pool, id).await?;
    if current.anonymized {
        return Ok(current);
    }

    sqlx::query(
        r#"
        UPDATE soap_notes
        SET subjective = 'ANONYMIZED CONTENT', objective = 'ANONYMIZED CONTENT',
            assessment = 'ANONYMIZED CONTENT', plan = 'ANONYMIZED CONTENT',
            clinician_signature = 'ANONYMIZED', anonymized = 1, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    get(pool, id).await
}
