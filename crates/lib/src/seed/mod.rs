//! # Demo Seed
//!
//! Creates the administrator account and, on an empty catalogue, a small
//! MBBS sample: two tracks, two subjects, two topics, notes, a summary, five
//! MCQs and a verified test student. Safe to run on every start-up.

use crate::{
    content::{self, NewMcq, NewSubject, NewTextContent, NewTopic, NewTrack, TextKind},
    errors::ZygoteError,
    types::{AnswerOption, ContentType, Difficulty},
};
use core_access::{AccountService, Role, columns, find_user_by_email};
use tracing::info;
use turso::Database;

pub const DEMO_STUDENT_EMAIL: &str = "student@test.com";
pub const DEMO_STUDENT_PASSWORD: &str = "Student@123";

const CARDIOVASCULAR_NOTES: &str = include_str!("cardiovascular_notes.md");
const CARDIOVASCULAR_SUMMARY: &str = include_str!("cardiovascular_summary.md");

/// What a seeding run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub admin_id: String,
    /// `false` when the catalogue already had tracks and was left alone.
    pub catalogue_seeded: bool,
}

pub async fn seed_demo_content(
    db: &Database,
    accounts: &AccountService,
    admin_email: &str,
    admin_password: &str,
) -> Result<SeedReport, ZygoteError> {
    let admin = accounts
        .ensure_account(admin_email, admin_password, "Admin User", Role::Admin)
        .await?;
    info!(email = %admin.email, "Admin account ready");

    let mut report = SeedReport {
        admin_id: admin.id.clone(),
        catalogue_seeded: false,
    };
    if catalogue_has_tracks(db).await? {
        info!("Catalogue already populated, skipping demo content");
        return Ok(report);
    }

    seed_catalogue(db, &admin.id).await?;

    let conn = db.connect()?;
    if find_user_by_email(&conn, DEMO_STUDENT_EMAIL).await?.is_none() {
        accounts
            .ensure_account(
                DEMO_STUDENT_EMAIL,
                DEMO_STUDENT_PASSWORD,
                "Test Student",
                Role::Student,
            )
            .await?;
    }

    report.catalogue_seeded = true;
    info!("Demo content seeded");
    Ok(report)
}

async fn catalogue_has_tracks(db: &Database) -> Result<bool, ZygoteError> {
    let conn = db.connect()?;
    let mut rows = conn.query("SELECT COUNT(*) FROM tracks", ()).await?;
    match rows.next().await? {
        Some(row) => Ok(columns::integer(&row, 0)? > 0),
        None => Ok(false),
    }
}

async fn seed_catalogue(db: &Database, admin_id: &str) -> Result<(), ZygoteError> {
    let first_year = content::tracks::create_track(
        db,
        admin_id,
        NewTrack {
            name: "First Year MBBS".to_string(),
            description: Some("Foundation of medical sciences".to_string()),
            year_number: 1,
            display_order: 1,
        },
    )
    .await?;
    content::tracks::create_track(
        db,
        admin_id,
        NewTrack {
            name: "Second Year MBBS".to_string(),
            description: Some("Pathophysiology and pharmacology".to_string()),
            year_number: 2,
            display_order: 2,
        },
    )
    .await?;

    let anatomy = content::subjects::create_subject(
        db,
        admin_id,
        NewSubject {
            track_id: first_year.id.clone(),
            name: "Anatomy".to_string(),
            description: Some("Study of human body structure".to_string()),
            icon_url: None,
            color_code: Some("#2563EB".to_string()),
            display_order: 1,
            is_free_trial: true,
        },
    )
    .await?;
    content::subjects::create_subject(
        db,
        admin_id,
        NewSubject {
            track_id: first_year.id,
            name: "Physiology".to_string(),
            description: Some("Study of body functions".to_string()),
            icon_url: None,
            color_code: Some("#059669".to_string()),
            display_order: 2,
            is_free_trial: false,
        },
    )
    .await?;

    let cardiovascular = content::topics::create_topic(
        db,
        admin_id,
        NewTopic {
            subject_id: anatomy.id.clone(),
            title: "Cardiovascular System".to_string(),
            description: Some("Heart and blood vessels anatomy".to_string()),
            display_order: 1,
            is_free_sample: true,
        },
    )
    .await?;
    content::topics::create_topic(
        db,
        admin_id,
        NewTopic {
            subject_id: anatomy.id,
            title: "Respiratory System".to_string(),
            description: Some("Lungs and airways anatomy".to_string()),
            display_order: 2,
            is_free_sample: false,
        },
    )
    .await?;

    for (kind, body) in [
        (TextKind::Notes, CARDIOVASCULAR_NOTES),
        (TextKind::Summary, CARDIOVASCULAR_SUMMARY),
    ] {
        content::materials::create_text_content(
            db,
            admin_id,
            &cardiovascular.id,
            kind,
            NewTextContent {
                content: body.to_string(),
                content_type: Some(ContentType::Markdown),
                pdf_url: None,
                version: None,
            },
        )
        .await?;
    }

    let mcqs = demo_mcqs()
        .into_iter()
        .enumerate()
        .map(|(i, (question, options, answer, explanation, difficulty))| {
            let [a, b, c, d] = options.map(str::to_string);
            NewMcq {
                topic_id: cardiovascular.id.clone(),
                question: question.to_string(),
                option_a: a,
                option_b: b,
                option_c: c,
                option_d: d,
                correct_answer: answer,
                explanation: Some(explanation.to_string()),
                difficulty: Some(difficulty),
                display_order: Some(i as i64 + 1),
            }
        })
        .collect();
    content::mcqs::create_mcqs_bulk(db, admin_id, mcqs).await?;
    Ok(())
}

type DemoMcq = (
    &'static str,
    [&'static str; 4],
    AnswerOption,
    &'static str,
    Difficulty,
);

fn demo_mcqs() -> Vec<DemoMcq> {
    vec![
        (
            "Which chamber of the heart receives oxygenated blood from the lungs?",
            ["Right Atrium", "Right Ventricle", "Left Atrium", "Left Ventricle"],
            AnswerOption::C,
            "Oxygenated blood returns from the lungs to the left atrium through the pulmonary veins.",
            Difficulty::Easy,
        ),
        (
            "Which valve prevents backflow of blood from the left ventricle to the left atrium?",
            ["Tricuspid Valve", "Mitral Valve", "Aortic Valve", "Pulmonary Valve"],
            AnswerOption::B,
            "The mitral (bicuspid) valve closes during ventricular systole, sealing the left atrium.",
            Difficulty::Moderate,
        ),
        (
            "Which blood vessel carries deoxygenated blood from the right ventricle to the lungs?",
            ["Aorta", "Pulmonary Vein", "Pulmonary Artery", "Vena Cava"],
            AnswerOption::C,
            "The pulmonary artery is the only artery carrying deoxygenated blood.",
            Difficulty::Easy,
        ),
        (
            "Which chamber of the heart has the thickest myocardial wall?",
            ["Right Atrium", "Right Ventricle", "Left Atrium", "Left Ventricle"],
            AnswerOption::D,
            "The left ventricle drives the whole systemic circulation and needs the most muscle.",
            Difficulty::Moderate,
        ),
        (
            "The sinoatrial (SA) node is located in which chamber?",
            ["Right Atrium", "Left Atrium", "Right Ventricle", "Left Ventricle"],
            AnswerOption::A,
            "The SA node sits in the right atrial wall near the opening of the superior vena cava.",
            Difficulty::Hard,
        ),
    ]
}
