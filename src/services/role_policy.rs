use std::collections::HashSet;

/// Static teacher allow-list. Everyone else is a student.
#[derive(Debug, Clone, Default)]
pub(crate) struct RolePolicy {
    teacher_ids: HashSet<i64>,
}

impl RolePolicy {
    pub(crate) fn new(teacher_ids: impl IntoIterator<Item = i64>) -> Self {
        Self { teacher_ids: teacher_ids.into_iter().collect() }
    }

    pub(crate) fn is_teacher(&self, user_id: i64) -> bool {
        self.teacher_ids.contains(&user_id)
    }

    pub(crate) fn teacher_count(&self) -> usize {
        self.teacher_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::RolePolicy;

    #[test]
    fn only_listed_ids_are_teachers() {
        let policy = RolePolicy::new([10, 20]);
        assert!(policy.is_teacher(10));
        assert!(policy.is_teacher(20));
        assert!(!policy.is_teacher(30));
        assert_eq!(policy.teacher_count(), 2);
    }

    #[test]
    fn empty_policy_denies_everyone() {
        let policy = RolePolicy::default();
        assert!(!policy.is_teacher(0));
        assert!(!policy.is_teacher(10));
    }
}
