//! PostgreSQL invitation store.
//!
//! Queries are runtime-checked (`sqlx::query_as` + [`sqlx::FromRow`]) so the
//! crate builds without a live database. Enum columns are `TEXT` and are
//! parsed back through the `carpool-core` role and status types.
//!
//! Race-freedom rests on the schema in `migrations/`:
//!
//! - terminal transitions are `UPDATE ... WHERE status = 'PENDING'` and
//!   report affected rows;
//! - partial unique indexes reject a second pending invitation for the same
//!   addressee;
//! - a unique index on `family_memberships(user_id)` rejects a second family.
//!
//! Unique violations surface as [`InvitationError::Conflict`].
//!
//! # Example
//!
//! ```no_run
//! use carpool_invitations::stores::PostgresInvitationStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresInvitationStore::new("postgres://localhost/carpool").await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{InvitationError, Result};
use crate::providers::{InvitationStore, StoreOps, StoreTx};
use carpool_core::{
    Child, Family, FamilyId, FamilyInvitation, FamilyMembership, FamilyRole, Group,
    GroupChildMembership, GroupFamilyMembership, GroupId, GroupInvitation, GroupRole,
    InvitationId, InvitationStatus, User, UserId, Vehicle,
};
use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::ops::DerefMut;
use uuid::Uuid;

/// PostgreSQL-backed [`InvitationStore`].
#[derive(Clone, Debug)]
pub struct PostgresInvitationStore {
    /// PostgreSQL connection pool.
    pool: PgPool,
}

impl PostgresInvitationStore {
    /// Connect to `database_url` with a default pool.
    ///
    /// # Errors
    ///
    /// Returns error if the connection fails.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| InvitationError::infrastructure(format!("Failed to connect: {e}")))?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| InvitationError::infrastructure(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

impl InvitationStore for PostgresInvitationStore {
    type Tx = PgHandle<Transaction<'static, Postgres>>;
    type Reader = PgHandle<PoolConnection<Postgres>>;

    async fn begin(&self) -> Result<Self::Tx> {
        let tx = self.pool.begin().await?;
        Ok(PgHandle { conn: tx })
    }

    async fn reader(&self) -> Result<Self::Reader> {
        let conn = self.pool.acquire().await?;
        Ok(PgHandle { conn })
    }
}

/// A pooled connection or an open transaction.
///
/// Dropping a transaction handle without committing rolls it back.
pub struct PgHandle<C> {
    conn: C,
}

impl StoreTx for PgHandle<Transaction<'static, Postgres>> {
    async fn commit(self) -> Result<()> {
        self.conn.commit().await?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Rows
// ═══════════════════════════════════════════════════════════════════════════

fn parse_family_role(value: &str) -> Result<FamilyRole> {
    FamilyRole::parse(value).map_err(|e| InvitationError::infrastructure(e.to_string()))
}

fn parse_group_role(value: &str) -> Result<GroupRole> {
    GroupRole::parse(value).map_err(|e| InvitationError::infrastructure(e.to_string()))
}

fn parse_status(value: &str) -> Result<InvitationStatus> {
    InvitationStatus::parse(value).map_err(|e| InvitationError::infrastructure(e.to_string()))
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
}

#[derive(sqlx::FromRow)]
struct FamilyRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: Uuid,
    name: String,
    owner_family_id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ChildRow {
    id: Uuid,
    family_id: Uuid,
    name: String,
}

#[derive(sqlx::FromRow)]
struct VehicleRow {
    id: Uuid,
    family_id: Uuid,
    description: String,
    seats: i32,
}

#[derive(sqlx::FromRow)]
struct FamilyMembershipRow {
    user_id: Uuid,
    family_id: Uuid,
    role: String,
    joined_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct GroupFamilyMembershipRow {
    family_id: Uuid,
    group_id: Uuid,
    role: String,
    joined_at: DateTime<Utc>,
    added_by: Uuid,
}

#[derive(sqlx::FromRow)]
struct FamilyInvitationRow {
    id: Uuid,
    family_id: Uuid,
    email: Option<String>,
    role: String,
    invite_code: String,
    personal_message: Option<String>,
    status: String,
    expires_at: DateTime<Utc>,
    invited_by: Uuid,
    accepted_by: Option<Uuid>,
    accepted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct GroupInvitationRow {
    id: Uuid,
    group_id: Uuid,
    target_family_id: Option<Uuid>,
    email: Option<String>,
    role: String,
    invite_code: String,
    personal_message: Option<String>,
    status: String,
    expires_at: DateTime<Utc>,
    created_by: Uuid,
    accepted_by: Option<Uuid>,
    accepted_family_id: Option<Uuid>,
    accepted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id.into(),
            email: row.email,
            name: row.name,
        }
    }
}

impl From<FamilyRow> for Family {
    fn from(row: FamilyRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            created_at: row.created_at,
        }
    }
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            owner_family_id: row.owner_family_id.into(),
            created_at: row.created_at,
        }
    }
}

impl From<ChildRow> for Child {
    fn from(row: ChildRow) -> Self {
        Self {
            id: row.id.into(),
            family_id: row.family_id.into(),
            name: row.name,
        }
    }
}

impl From<VehicleRow> for Vehicle {
    fn from(row: VehicleRow) -> Self {
        Self {
            id: row.id.into(),
            family_id: row.family_id.into(),
            description: row.description,
            seats: row.seats,
        }
    }
}

impl TryFrom<FamilyMembershipRow> for FamilyMembership {
    type Error = InvitationError;

    fn try_from(row: FamilyMembershipRow) -> Result<Self> {
        Ok(Self {
            user_id: row.user_id.into(),
            family_id: row.family_id.into(),
            role: parse_family_role(&row.role)?,
            joined_at: row.joined_at,
        })
    }
}

impl TryFrom<GroupFamilyMembershipRow> for GroupFamilyMembership {
    type Error = InvitationError;

    fn try_from(row: GroupFamilyMembershipRow) -> Result<Self> {
        Ok(Self {
            family_id: row.family_id.into(),
            group_id: row.group_id.into(),
            role: parse_group_role(&row.role)?,
            joined_at: row.joined_at,
            added_by: row.added_by.into(),
        })
    }
}

impl TryFrom<FamilyInvitationRow> for FamilyInvitation {
    type Error = InvitationError;

    fn try_from(row: FamilyInvitationRow) -> Result<Self> {
        Ok(Self {
            id: row.id.into(),
            family_id: row.family_id.into(),
            email: row.email,
            role: parse_family_role(&row.role)?,
            invite_code: row.invite_code,
            personal_message: row.personal_message,
            status: parse_status(&row.status)?,
            expires_at: row.expires_at,
            invited_by: row.invited_by.into(),
            accepted_by: row.accepted_by.map(UserId::from),
            accepted_at: row.accepted_at,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<GroupInvitationRow> for GroupInvitation {
    type Error = InvitationError;

    fn try_from(row: GroupInvitationRow) -> Result<Self> {
        Ok(Self {
            id: row.id.into(),
            group_id: row.group_id.into(),
            target_family_id: row.target_family_id.map(FamilyId::from),
            email: row.email,
            role: parse_group_role(&row.role)?,
            invite_code: row.invite_code,
            personal_message: row.personal_message,
            status: parse_status(&row.status)?,
            expires_at: row.expires_at,
            created_by: row.created_by.into(),
            accepted_by: row.accepted_by.map(UserId::from),
            accepted_family_id: row.accepted_family_id.map(FamilyId::from),
            accepted_at: row.accepted_at,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = InvitationError>,
{
    rows.into_iter().map(T::try_from).collect()
}

macro_rules! family_invitation_columns {
    () => {
        "id, family_id, email, role, invite_code, personal_message, status, \
         expires_at, invited_by, accepted_by, accepted_at, created_at"
    };
}

macro_rules! group_invitation_columns {
    () => {
        "id, group_id, target_family_id, email, role, invite_code, personal_message, \
         status, expires_at, created_by, accepted_by, accepted_family_id, accepted_at, \
         created_at"
    };
}

// ═══════════════════════════════════════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════════════════════════════════════

impl<C> StoreOps for PgHandle<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn get_user(&mut self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, email, name FROM users WHERE id = $1")
            .bind(user_id.0)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(row.map(User::from))
    }

    async fn get_family(&mut self, family_id: FamilyId) -> Result<Option<Family>> {
        let row = sqlx::query_as::<_, FamilyRow>(
            "SELECT id, name, created_at FROM families WHERE id = $1",
        )
        .bind(family_id.0)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(row.map(Family::from))
    }

    async fn get_group(&mut self, group_id: GroupId) -> Result<Option<Group>> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, owner_family_id, created_at FROM carpool_groups WHERE id = $1",
        )
        .bind(group_id.0)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(row.map(Group::from))
    }

    async fn list_children(&mut self, family_id: FamilyId) -> Result<Vec<Child>> {
        let rows = sqlx::query_as::<_, ChildRow>(
            "SELECT id, family_id, name FROM children WHERE family_id = $1 ORDER BY created_at",
        )
        .bind(family_id.0)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(rows.into_iter().map(Child::from).collect())
    }

    async fn list_vehicles(&mut self, family_id: FamilyId) -> Result<Vec<Vehicle>> {
        let rows = sqlx::query_as::<_, VehicleRow>(
            "SELECT id, family_id, description, seats FROM vehicles WHERE family_id = $1",
        )
        .bind(family_id.0)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(rows.into_iter().map(Vehicle::from).collect())
    }

    async fn get_membership_for_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<FamilyMembership>> {
        sqlx::query_as::<_, FamilyMembershipRow>(
            "SELECT user_id, family_id, role, joined_at FROM family_memberships WHERE user_id = $1",
        )
        .bind(user_id.0)
        .fetch_optional(&mut *self.conn)
        .await?
        .map(FamilyMembership::try_from)
        .transpose()
    }

    async fn list_family_members(&mut self, family_id: FamilyId) -> Result<Vec<FamilyMembership>> {
        let rows = sqlx::query_as::<_, FamilyMembershipRow>(
            r"
            SELECT user_id, family_id, role, joined_at
            FROM family_memberships
            WHERE family_id = $1
            ORDER BY joined_at
            ",
        )
        .bind(family_id.0)
        .fetch_all(&mut *self.conn)
        .await?;
        convert_all(rows)
    }

    async fn count_family_admins(&mut self, family_id: FamilyId) -> Result<u64> {
        sqlx::query("SELECT id FROM families WHERE id = $1 FOR UPDATE")
            .bind(family_id.0)
            .fetch_optional(&mut *self.conn)
            .await?;

        // Separate statement: sees admin changes committed while we waited.
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM family_memberships WHERE family_id = $1 AND role = 'ADMIN'",
        )
        .bind(family_id.0)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn create_family_membership(&mut self, membership: &FamilyMembership) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO family_memberships (user_id, family_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(membership.user_id.0)
        .bind(membership.family_id.0)
        .bind(membership.role.as_str())
        .bind(membership.joined_at)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    async fn delete_family_membership(
        &mut self,
        user_id: UserId,
        family_id: FamilyId,
    ) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM family_memberships WHERE user_id = $1 AND family_id = $2")
                .bind(user_id.0)
                .bind(family_id.0)
                .execute(&mut *self.conn)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_group_family_membership(
        &mut self,
        group_id: GroupId,
        family_id: FamilyId,
    ) -> Result<Option<GroupFamilyMembership>> {
        sqlx::query_as::<_, GroupFamilyMembershipRow>(
            r"
            SELECT family_id, group_id, role, joined_at, added_by
            FROM group_family_memberships
            WHERE group_id = $1 AND family_id = $2
            ",
        )
        .bind(group_id.0)
        .bind(family_id.0)
        .fetch_optional(&mut *self.conn)
        .await?
        .map(GroupFamilyMembership::try_from)
        .transpose()
    }

    async fn create_group_family_membership(
        &mut self,
        membership: &GroupFamilyMembership,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO group_family_memberships (family_id, group_id, role, joined_at, added_by)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(membership.family_id.0)
        .bind(membership.group_id.0)
        .bind(membership.role.as_str())
        .bind(membership.joined_at)
        .bind(membership.added_by.0)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    async fn create_group_child_memberships(
        &mut self,
        memberships: &[GroupChildMembership],
    ) -> Result<u64> {
        if memberships.is_empty() {
            return Ok(0);
        }
        let group_ids: Vec<Uuid> = memberships.iter().map(|m| m.group_id.0).collect();
        let child_ids: Vec<Uuid> = memberships.iter().map(|m| m.child_id.0).collect();
        let added_at: Vec<DateTime<Utc>> = memberships.iter().map(|m| m.added_at).collect();

        let result = sqlx::query(
            r"
            INSERT INTO group_child_memberships (group_id, child_id, added_at)
            SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::timestamptz[])
            ON CONFLICT (group_id, child_id) DO NOTHING
            ",
        )
        .bind(group_ids)
        .bind(child_ids)
        .bind(added_at)
        .execute(&mut *self.conn)
        .await?;
        Ok(result.rows_affected())
    }

    async fn invite_code_exists(&mut self, code: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (SELECT 1 FROM family_invitations WHERE invite_code = $1)
                OR EXISTS (SELECT 1 FROM group_invitations WHERE invite_code = $1)
            ",
        )
        .bind(code)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(exists)
    }

    async fn insert_family_invitation(&mut self, invitation: &FamilyInvitation) -> Result<()> {
        sqlx::query(concat!(
            "INSERT INTO family_invitations (",
            family_invitation_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(invitation.id.0)
        .bind(invitation.family_id.0)
        .bind(invitation.email.as_deref())
        .bind(invitation.role.as_str())
        .bind(&invitation.invite_code)
        .bind(invitation.personal_message.as_deref())
        .bind(invitation.status.as_str())
        .bind(invitation.expires_at)
        .bind(invitation.invited_by.0)
        .bind(invitation.accepted_by.map(|u| u.0))
        .bind(invitation.accepted_at)
        .bind(invitation.created_at)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    async fn find_family_invitation(
        &mut self,
        id: InvitationId,
    ) -> Result<Option<FamilyInvitation>> {
        sqlx::query_as::<_, FamilyInvitationRow>(concat!(
            "SELECT ",
            family_invitation_columns!(),
            " FROM family_invitations WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&mut *self.conn)
        .await?
        .map(FamilyInvitation::try_from)
        .transpose()
    }

    async fn find_family_invitation_by_code(
        &mut self,
        code: &str,
    ) -> Result<Option<FamilyInvitation>> {
        sqlx::query_as::<_, FamilyInvitationRow>(concat!(
            "SELECT ",
            family_invitation_columns!(),
            " FROM family_invitations WHERE invite_code = $1"
        ))
        .bind(code)
        .fetch_optional(&mut *self.conn)
        .await?
        .map(FamilyInvitation::try_from)
        .transpose()
    }

    async fn find_pending_family_invitation_for_email(
        &mut self,
        family_id: FamilyId,
        email: &str,
    ) -> Result<Option<FamilyInvitation>> {
        sqlx::query_as::<_, FamilyInvitationRow>(concat!(
            "SELECT ",
            family_invitation_columns!(),
            " FROM family_invitations",
            " WHERE family_id = $1 AND email = $2 AND status = 'PENDING'",
            " FOR UPDATE"
        ))
        .bind(family_id.0)
        .bind(email)
        .fetch_optional(&mut *self.conn)
        .await?
        .map(FamilyInvitation::try_from)
        .transpose()
    }

    async fn list_family_invitations(
        &mut self,
        family_id: FamilyId,
    ) -> Result<Vec<FamilyInvitation>> {
        let rows = sqlx::query_as::<_, FamilyInvitationRow>(concat!(
            "SELECT ",
            family_invitation_columns!(),
            " FROM family_invitations WHERE family_id = $1 ORDER BY created_at DESC"
        ))
        .bind(family_id.0)
        .fetch_all(&mut *self.conn)
        .await?;
        convert_all(rows)
    }

    async fn list_active_family_invitations_for_email(
        &mut self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<FamilyInvitation>> {
        let rows = sqlx::query_as::<_, FamilyInvitationRow>(concat!(
            "SELECT ",
            family_invitation_columns!(),
            " FROM family_invitations",
            " WHERE email = $1 AND status = 'PENDING' AND expires_at >= $2",
            " ORDER BY created_at DESC"
        ))
        .bind(email)
        .bind(now)
        .fetch_all(&mut *self.conn)
        .await?;
        convert_all(rows)
    }

    async fn mark_family_invitation_accepted(
        &mut self,
        id: InvitationId,
        accepted_by: UserId,
        accepted_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE family_invitations
            SET status = 'ACCEPTED', accepted_by = $2, accepted_at = $3
            WHERE id = $1 AND status = 'PENDING'
            ",
        )
        .bind(id.0)
        .bind(accepted_by.0)
        .bind(accepted_at)
        .execute(&mut *self.conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn cancel_family_invitation(&mut self, id: InvitationId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE family_invitations SET status = 'CANCELLED' WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(id.0)
        .execute(&mut *self.conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_family_invitation_expired(&mut self, id: InvitationId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE family_invitations SET status = 'EXPIRED' WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(id.0)
        .execute(&mut *self.conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn expire_family_invitations(&mut self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE family_invitations
            SET status = 'EXPIRED'
            WHERE status = 'PENDING' AND expires_at < $1
            ",
        )
        .bind(now)
        .execute(&mut *self.conn)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_group_invitation(&mut self, invitation: &GroupInvitation) -> Result<()> {
        sqlx::query(concat!(
            "INSERT INTO group_invitations (",
            group_invitation_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(invitation.id.0)
        .bind(invitation.group_id.0)
        .bind(invitation.target_family_id.map(|f| f.0))
        .bind(invitation.email.as_deref())
        .bind(invitation.role.as_str())
        .bind(&invitation.invite_code)
        .bind(invitation.personal_message.as_deref())
        .bind(invitation.status.as_str())
        .bind(invitation.expires_at)
        .bind(invitation.created_by.0)
        .bind(invitation.accepted_by.map(|u| u.0))
        .bind(invitation.accepted_family_id.map(|f| f.0))
        .bind(invitation.accepted_at)
        .bind(invitation.created_at)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    async fn find_group_invitation(&mut self, id: InvitationId) -> Result<Option<GroupInvitation>> {
        sqlx::query_as::<_, GroupInvitationRow>(concat!(
            "SELECT ",
            group_invitation_columns!(),
            " FROM group_invitations WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&mut *self.conn)
        .await?
        .map(GroupInvitation::try_from)
        .transpose()
    }

    async fn find_group_invitation_by_code(
        &mut self,
        code: &str,
    ) -> Result<Option<GroupInvitation>> {
        sqlx::query_as::<_, GroupInvitationRow>(concat!(
            "SELECT ",
            group_invitation_columns!(),
            " FROM group_invitations WHERE invite_code = $1"
        ))
        .bind(code)
        .fetch_optional(&mut *self.conn)
        .await?
        .map(GroupInvitation::try_from)
        .transpose()
    }

    async fn find_pending_group_invitation_for_family(
        &mut self,
        group_id: GroupId,
        family_id: FamilyId,
    ) -> Result<Option<GroupInvitation>> {
        sqlx::query_as::<_, GroupInvitationRow>(concat!(
            "SELECT ",
            group_invitation_columns!(),
            " FROM group_invitations",
            " WHERE group_id = $1 AND target_family_id = $2 AND status = 'PENDING'",
            " FOR UPDATE"
        ))
        .bind(group_id.0)
        .bind(family_id.0)
        .fetch_optional(&mut *self.conn)
        .await?
        .map(GroupInvitation::try_from)
        .transpose()
    }

    async fn find_pending_group_invitation_for_email(
        &mut self,
        group_id: GroupId,
        email: &str,
    ) -> Result<Option<GroupInvitation>> {
        sqlx::query_as::<_, GroupInvitationRow>(concat!(
            "SELECT ",
            group_invitation_columns!(),
            " FROM group_invitations",
            " WHERE group_id = $1 AND email = $2 AND status = 'PENDING'",
            " FOR UPDATE"
        ))
        .bind(group_id.0)
        .bind(email)
        .fetch_optional(&mut *self.conn)
        .await?
        .map(GroupInvitation::try_from)
        .transpose()
    }

    async fn list_group_invitations(&mut self, group_id: GroupId) -> Result<Vec<GroupInvitation>> {
        let rows = sqlx::query_as::<_, GroupInvitationRow>(concat!(
            "SELECT ",
            group_invitation_columns!(),
            " FROM group_invitations WHERE group_id = $1 ORDER BY created_at DESC"
        ))
        .bind(group_id.0)
        .fetch_all(&mut *self.conn)
        .await?;
        convert_all(rows)
    }

    async fn list_active_group_invitations_for_email(
        &mut self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<GroupInvitation>> {
        let rows = sqlx::query_as::<_, GroupInvitationRow>(concat!(
            "SELECT ",
            group_invitation_columns!(),
            " FROM group_invitations",
            " WHERE email = $1 AND status = 'PENDING' AND expires_at >= $2",
            " ORDER BY created_at DESC"
        ))
        .bind(email)
        .bind(now)
        .fetch_all(&mut *self.conn)
        .await?;
        convert_all(rows)
    }

    async fn list_active_group_invitations_for_family(
        &mut self,
        family_id: FamilyId,
        now: DateTime<Utc>,
    ) -> Result<Vec<GroupInvitation>> {
        let rows = sqlx::query_as::<_, GroupInvitationRow>(concat!(
            "SELECT ",
            group_invitation_columns!(),
            " FROM group_invitations",
            " WHERE target_family_id = $1 AND status = 'PENDING' AND expires_at >= $2",
            " ORDER BY created_at DESC"
        ))
        .bind(family_id.0)
        .bind(now)
        .fetch_all(&mut *self.conn)
        .await?;
        convert_all(rows)
    }

    async fn mark_group_invitation_accepted(
        &mut self,
        id: InvitationId,
        accepted_by: UserId,
        family_id: FamilyId,
        accepted_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE group_invitations
            SET status = 'ACCEPTED', accepted_by = $2, accepted_family_id = $3, accepted_at = $4
            WHERE id = $1 AND status = 'PENDING'
            ",
        )
        .bind(id.0)
        .bind(accepted_by.0)
        .bind(family_id.0)
        .bind(accepted_at)
        .execute(&mut *self.conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn cancel_group_invitation(&mut self, id: InvitationId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE group_invitations SET status = 'CANCELLED' WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(id.0)
        .execute(&mut *self.conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_group_invitation_expired(&mut self, id: InvitationId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE group_invitations SET status = 'EXPIRED' WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(id.0)
        .execute(&mut *self.conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn expire_group_invitations(&mut self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE group_invitations
            SET status = 'EXPIRED'
            WHERE status = 'PENDING' AND expires_at < $1
            ",
        )
        .bind(now)
        .execute(&mut *self.conn)
        .await?;
        Ok(result.rows_affected())
    }
}
