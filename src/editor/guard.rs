// attendance-record: navigation guard

use super::{AttendanceEditor, RecordState};
use crate::model::Route;
use crate::services::{AttendanceRepository, ConfirmationPrompt, Navigator, Notifier, PatientDirectory};

const LEAVE_EXISTING: &str = "Leave this attendance? Changes that were not saved will be lost.";
const DISCARD_NEW: &str = "Discard the attendance being created?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// Start a fresh record.
    NewRecord,
    /// Return to the listing.
    Back,
}

impl NavigationKind {
    fn target(self) -> Route {
        match self {
            NavigationKind::NewRecord => Route::NewRecord,
            NavigationKind::Back => Route::Listing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    Proceeded(Route),
    Cancelled,
}

impl<R, P, N, C, V> AttendanceEditor<R, P, N, C, V>
where
    R: AttendanceRepository,
    P: PatientDirectory,
    N: Notifier,
    C: ConfirmationPrompt,
    V: Navigator,
{
    /// Message to confirm before leaving, if leaving would put work at risk.
    ///
    /// An existing record always asks; a new one only once something was typed.
    fn leave_warning(&self) -> Option<&'static str> {
        match self.phase {
            RecordState::EditingExisting => Some(LEAVE_EXISTING),
            RecordState::New if self.form.is_dirty() => Some(DISCARD_NEW),
            _ => None,
        }
    }

    /// Handle "new record" and "back", asking first when needed.
    ///
    /// A rejected confirmation changes nothing.
    pub async fn request_navigate(&mut self, kind: NavigationKind) -> NavigationOutcome {
        if let Some(message) = self.leave_warning() {
            if !self.services.prompt.confirm(message).await {
                tracing::debug!(?kind, "Navigation cancelled by user");
                return NavigationOutcome::Cancelled;
            }
        }

        let target = kind.target();
        self.services.navigator.navigate(target);
        if kind == NavigationKind::NewRecord {
            self.reset_new();
        }
        NavigationOutcome::Proceeded(target)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::model::RichTextField;

    #[tokio::test]
    async fn back_from_existing_with_rejection_is_a_no_op() {
        let repo = FakeRepository::with_record(stored_record(42, 7));
        let mut editor = open_editor_with_prompt(repo, Route::Record(42), Some("42"), false).await;
        let before = editor.record().clone();

        let outcome = editor.request_navigate(NavigationKind::Back).await;

        assert_eq!(outcome, NavigationOutcome::Cancelled);
        assert_eq!(editor.state(), RecordState::EditingExisting);
        assert_eq!(editor.record(), &before);
        assert!(editor.services().navigator.navigated.borrow().is_empty());
        assert_eq!(*editor.services().prompt.asked.borrow(), vec![LEAVE_EXISTING.to_string()]);
    }

    #[tokio::test]
    async fn back_from_existing_with_acceptance_navigates() {
        let repo = FakeRepository::with_record(stored_record(42, 7));
        let mut editor = open_editor_with_prompt(repo, Route::Record(42), Some("42"), true).await;

        let outcome = editor.request_navigate(NavigationKind::Back).await;

        assert_eq!(outcome, NavigationOutcome::Proceeded(Route::Listing));
        assert_eq!(*editor.services().navigator.navigated.borrow(), vec![Route::Listing]);
    }

    #[tokio::test]
    async fn clean_new_record_leaves_without_asking() {
        let mut editor =
            open_editor_with_prompt(FakeRepository::default(), Route::NewRecord, None, false).await;

        let outcome = editor.request_navigate(NavigationKind::Back).await;

        assert_eq!(outcome, NavigationOutcome::Proceeded(Route::Listing));
        assert!(editor.services().prompt.asked.borrow().is_empty());
    }

    #[tokio::test]
    async fn dirty_new_record_asks_before_discarding() {
        let mut editor =
            open_editor_with_prompt(FakeRepository::default(), Route::NewRecord, None, false).await;
        editor.set_field(RichTextField::Budget, Some("R$ 50".into()));

        let outcome = editor.request_navigate(NavigationKind::NewRecord).await;

        assert_eq!(outcome, NavigationOutcome::Cancelled);
        assert_eq!(editor.record().budget.as_deref(), Some("R$ 50"));
        assert_eq!(*editor.services().prompt.asked.borrow(), vec![DISCARD_NEW.to_string()]);
    }

    #[tokio::test]
    async fn accepted_new_record_resets_the_editor() {
        let repo = FakeRepository::with_record(stored_record(42, 7));
        let mut editor = open_editor_with_prompt(repo, Route::Record(42), Some("42"), true).await;
        editor.set_field(RichTextField::Budget, Some("R$ 50".into()));

        let outcome = editor.request_navigate(NavigationKind::NewRecord).await;

        assert_eq!(outcome, NavigationOutcome::Proceeded(Route::NewRecord));
        assert_eq!(editor.state(), RecordState::New);
        assert_eq!(editor.record().id, 0);
        assert_eq!(editor.record().budget, None);
        assert!(!editor.form().is_dirty());
    }
}
