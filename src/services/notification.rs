//! Notification records: creation inside the caller's transaction, listing and read state.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::locale::LocalizedText;
use crate::models::notification::{NewNotification, Notification, NotificationKind};

/// Kind plus trilingual title and message for one notification event.
#[derive(Debug, Clone)]
pub struct Template {
    pub kind: NotificationKind,
    pub title: LocalizedText,
    pub message: LocalizedText,
}

impl Template {
    pub fn addressed_to(
        self,
        user_id: Uuid,
        actor_id: Option<Uuid>,
        model: &'static str,
        model_id: Option<Uuid>,
    ) -> NewNotification {
        NewNotification {
            user_id,
            actor_id,
            kind: self.kind,
            model,
            model_id,
            title: self.title,
            message: self.message,
        }
    }
}

pub mod templates {
    use super::Template;
    use crate::models::locale::LocalizedText;
    use crate::models::notification::NotificationKind;
    use crate::models::reservation::ReservationStatus;

    pub fn club_registered(club_name: &str) -> Template {
        Template {
            kind: NotificationKind::ClubRegistered,
            title: LocalizedText::new(
                "Nouvelle inscription de club",
                "تسجيل نادٍ جديد",
                "New club registration",
            ),
            message: LocalizedText::new(
                format!("Le club {club_name} attend votre validation."),
                format!("النادي {club_name} في انتظار موافقتكم."),
                format!("Club {club_name} is waiting for your approval."),
            ),
        }
    }

    pub fn account_approved() -> Template {
        Template {
            kind: NotificationKind::AccountApproved,
            title: LocalizedText::new("Compte approuvé", "تمت الموافقة على الحساب", "Account approved"),
            message: LocalizedText::new(
                "Votre compte a été approuvé. Vous pouvez maintenant réserver.",
                "تمت الموافقة على حسابكم. يمكنكم الآن الحجز.",
                "Your account has been approved. You can now make reservations.",
            ),
        }
    }

    pub fn account_declined() -> Template {
        Template {
            kind: NotificationKind::AccountDeclined,
            title: LocalizedText::new("Compte refusé", "تم رفض الحساب", "Account declined"),
            message: LocalizedText::new(
                "Votre demande d'inscription a été refusée.",
                "تم رفض طلب التسجيل الخاص بكم.",
                "Your registration request has been declined.",
            ),
        }
    }

    pub fn reservation_created(stadium_name: &str) -> Template {
        Template {
            kind: NotificationKind::ReservationCreated,
            title: LocalizedText::new("Nouvelle réservation", "حجز جديد", "New reservation"),
            message: LocalizedText::new(
                format!("Une réservation a été demandée pour {stadium_name}."),
                format!("تم طلب حجز في {stadium_name}."),
                format!("A reservation was requested for {stadium_name}."),
            ),
        }
    }

    pub fn reservation_status_changed(status: ReservationStatus) -> Template {
        let (fr, ar, en) = match status {
            ReservationStatus::Pending => ("en attente", "قيد الانتظار", "pending"),
            ReservationStatus::Approved => ("approuvée", "مقبول", "approved"),
            ReservationStatus::Declined => ("refusée", "مرفوض", "declined"),
            ReservationStatus::Cancelled => ("annulée", "ملغى", "cancelled"),
            ReservationStatus::Paid => ("payée", "مدفوع", "paid"),
            ReservationStatus::Unpaid => ("impayée", "غير مدفوع", "unpaid"),
        };
        Template {
            kind: NotificationKind::ReservationStatusChanged,
            title: LocalizedText::new(
                "Mise à jour de réservation",
                "تحديث الحجز",
                "Reservation update",
            ),
            message: LocalizedText::new(
                format!("Votre réservation est maintenant {fr}."),
                format!("حالة حجزكم الآن: {ar}."),
                format!("Your reservation is now {en}."),
            ),
        }
    }

    pub fn payment_recorded(amount: f64, remaining: f64) -> Template {
        Template {
            kind: NotificationKind::PaymentRecorded,
            title: LocalizedText::new("Paiement enregistré", "تم تسجيل الدفع", "Payment recorded"),
            message: LocalizedText::new(
                format!("Paiement de {amount:.2} MAD reçu. Reste à payer : {remaining:.2} MAD."),
                format!("تم استلام دفعة بقيمة {amount:.2} درهم. المبلغ المتبقي: {remaining:.2} درهم."),
                format!("Payment of {amount:.2} MAD received. Remaining: {remaining:.2} MAD."),
            ),
        }
    }
}

/// Insert one notification.
pub async fn create(
    conn: &mut PgConnection,
    notification: NewNotification,
) -> Result<Notification, AppError> {
    let row = sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (user_id, actor_id, kind, model, model_id,
            title_fr, title_ar, title_en, message_fr, message_ar, message_en)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(notification.user_id)
    .bind(notification.actor_id)
    .bind(notification.kind)
    .bind(notification.model)
    .bind(notification.model_id)
    .bind(&notification.title.fr)
    .bind(&notification.title.ar)
    .bind(&notification.title.en)
    .bind(&notification.message.fr)
    .bind(&notification.message.ar)
    .bind(&notification.message.en)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Fan a notification out to every active administrator. Returns the number inserted.
pub async fn notify_admins(
    conn: &mut PgConnection,
    actor_id: Option<Uuid>,
    model: &'static str,
    model_id: Option<Uuid>,
    template: Template,
) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, actor_id, kind, model, model_id,
            title_fr, title_ar, title_en, message_fr, message_ar, message_en)
        SELECT u.id, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
        FROM users u
        WHERE u.role = 'ADMIN' AND u.deleted_at IS NULL
        "#,
    )
    .bind(actor_id)
    .bind(template.kind)
    .bind(model)
    .bind(model_id)
    .bind(&template.title.fr)
    .bind(&template.title.ar)
    .bind(&template.title.en)
    .bind(&template.message.fr)
    .bind(&template.message.ar)
    .bind(&template.message.en)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// The user's notifications, newest first.
pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Notification>, AppError> {
    let rows = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT 100",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Mark one of the user's notifications as read.
pub async fn mark_read(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Notification, AppError> {
    sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
}

pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, AppError> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = true WHERE user_id = $1 AND is_read = false",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
