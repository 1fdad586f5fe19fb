use anyhow::{Context, Result};
use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::models::{
    NewCustomer, NewCustomerNote, NewUser, NoteAuthor, Role, SeedCustomer, SeedNote, SeedUser,
};

#[async_trait]
pub trait SeedStore: Send + Sync {
    async fn find_user_id(&self, username: &str, email: &str) -> Result<Option<i64>>;

    async fn insert_user(&self, user: &NewUser) -> Result<i64>;

    async fn find_customer_id_by_email(&self, email: &str) -> Result<Option<i64>>;

    async fn insert_customer(&self, customer: &NewCustomer) -> Result<i64>;

    async fn note_exists(&self, customer_id: i64, content: &str) -> Result<bool>;

    async fn insert_note(&self, note: &NewCustomerNote) -> Result<i64>;
}

#[derive(Clone, Debug)]
pub struct SeedData {
    pub users: Vec<SeedUser>,
    pub customers: Vec<SeedCustomer>,
    pub notes: Vec<SeedNote>,
    pub bcrypt_cost: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users_inserted: u32,
    pub users_skipped: u32,
    pub customers_inserted: u32,
    pub customers_skipped: u32,
    pub notes_inserted: u32,
    pub notes_skipped: u32,
    pub notes_orphaned: u32,
}

impl SeedReport {
    pub fn inserted(&self) -> u32 {
        self.users_inserted + self.customers_inserted + self.notes_inserted
    }
}

impl Default for SeedData {
    fn default() -> Self {
        Self {
            users: vec![
                SeedUser {
                    username: "admin",
                    email: "admin@quickcrm.com",
                    password: "Admin123!",
                    role: Role::Admin,
                },
                SeedUser {
                    username: "demo",
                    email: "demo@quickcrm.com",
                    password: "Demo123!",
                    role: Role::User,
                },
            ],
            customers: vec![
                SeedCustomer {
                    first_name: "Ahmet",
                    last_name: "Yılmaz",
                    email: "ahmet.yilmaz@example.com",
                    phone: "0532 123 45 67",
                    company: "ABC Teknoloji",
                    notes: "Potansiyel müşteri",
                    is_active: true,
                    created_days_ago: 0,
                    updated_days_ago: 0,
                },
                SeedCustomer {
                    first_name: "Ayşe",
                    last_name: "Demir",
                    email: "ayse.demir@example.com",
                    phone: "0533 987 65 43",
                    company: "XYZ Yazılım",
                    notes: "Aktif müşteri",
                    is_active: true,
                    created_days_ago: 0,
                    updated_days_ago: 0,
                },
                SeedCustomer {
                    first_name: "Mehmet",
                    last_name: "Kaya",
                    email: "mehmet.kaya@example.com",
                    phone: "0534 555 44 33",
                    company: "DEF Danışmanlık",
                    notes: "Eski müşteri",
                    is_active: false,
                    created_days_ago: 30,
                    updated_days_ago: 10,
                },
            ],
            notes: vec![
                SeedNote {
                    customer_email: "ahmet.yilmaz@example.com",
                    content: "İlk görüşme yapıldı, teklif bekleniyor.",
                    created_by: NoteAuthor::Admin,
                },
                SeedNote {
                    customer_email: "ahmet.yilmaz@example.com",
                    content: "Demo sunumu için uygun zamanı bildireceğim.",
                    created_by: NoteAuthor::Customer,
                },
                SeedNote {
                    customer_email: "ayse.demir@example.com",
                    content: "Yıllık sözleşme yenilendi.",
                    created_by: NoteAuthor::Admin,
                },
                SeedNote {
                    customer_email: "mehmet.kaya@example.com",
                    content: "Müşteri hizmeti askıya aldı.",
                    created_by: NoteAuthor::Admin,
                },
                SeedNote {
                    customer_email: "zeynep.arslan@example.com",
                    content: "Referans müşteri olarak eklenecek.",
                    created_by: NoteAuthor::Admin,
                },
            ],
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Inserts every record of `data` whose natural key is not yet present.
/// Existing rows are never updated or deleted.
pub async fn run(store: &(impl SeedStore + ?Sized), data: &SeedData) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    let now = OffsetDateTime::now_utc();

    for user in &data.users {
        if store
            .find_user_id(user.username, user.email)
            .await
            .with_context(|| format!("look up user {}", user.username))?
            .is_some()
        {
            report.users_skipped += 1;
            continue;
        }
        let (password, cost) = (user.password, data.bcrypt_cost);
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .context("join password hashing task")?
            .with_context(|| format!("hash password for {}", user.username))?;
        store
            .insert_user(&NewUser {
                username: user.username.to_owned(),
                email: user.email.to_owned(),
                password_hash,
                role: user.role,
            })
            .await
            .with_context(|| format!("insert user {}", user.username))?;
        report.users_inserted += 1;
    }

    for customer in &data.customers {
        if store
            .find_customer_id_by_email(customer.email)
            .await
            .with_context(|| format!("look up customer {}", customer.email))?
            .is_some()
        {
            report.customers_skipped += 1;
            continue;
        }
        store
            .insert_customer(&customer.to_new(now))
            .await
            .with_context(|| format!("insert customer {}", customer.email))?;
        report.customers_inserted += 1;
    }

    for note in &data.notes {
        let Some(customer_id) = store
            .find_customer_id_by_email(note.customer_email)
            .await
            .with_context(|| format!("resolve note owner {}", note.customer_email))?
        else {
            debug!(customer = note.customer_email, "note owner not found, skipping");
            report.notes_orphaned += 1;
            continue;
        };
        if store
            .note_exists(customer_id, note.content)
            .await
            .context("look up customer note")?
        {
            report.notes_skipped += 1;
            continue;
        }
        store
            .insert_note(&NewCustomerNote {
                customer_id,
                content: note.content.to_owned(),
                created_by: note.created_by,
            })
            .await
            .with_context(|| format!("insert note for customer {customer_id}"))?;
        report.notes_inserted += 1;
    }

    info!(
        users = report.users_inserted,
        customers = report.customers_inserted,
        notes = report.notes_inserted,
        "seed data applied"
    );
    Ok(report)
}
