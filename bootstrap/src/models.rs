use time::{Duration, OffsetDateTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteAuthor {
    Admin,
    Customer,
}

impl NoteAuthor {
    pub fn as_str(self) -> &'static str {
        match self {
            NoteAuthor::Admin => "admin",
            NoteAuthor::Customer => "customer",
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Clone, Debug)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug)]
pub struct NewCustomerNote {
    pub customer_id: i64,
    pub content: String,
    pub created_by: NoteAuthor,
}

// Seed definitions. These carry natural keys only; row ids are resolved at
// seeding time.

#[derive(Clone, Debug)]
pub struct SeedUser {
    pub username: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub role: Role,
}

#[derive(Clone, Debug)]
pub struct SeedCustomer {
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub email: &'static str,
    pub phone: &'static str,
    pub company: &'static str,
    pub notes: &'static str,
    pub is_active: bool,
    pub created_days_ago: i64,
    pub updated_days_ago: i64,
}

impl SeedCustomer {
    pub fn to_new(&self, now: OffsetDateTime) -> NewCustomer {
        NewCustomer {
            first_name: self.first_name.to_owned(),
            last_name: self.last_name.to_owned(),
            email: self.email.to_owned(),
            phone: Some(self.phone.to_owned()),
            company: Some(self.company.to_owned()),
            notes: Some(self.notes.to_owned()),
            is_active: self.is_active,
            created_at: now - Duration::days(self.created_days_ago),
            updated_at: now - Duration::days(self.updated_days_ago),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SeedNote {
    pub customer_email: &'static str,
    pub content: &'static str,
    pub created_by: NoteAuthor,
}
