//! Property tests for the authorization decision.

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use warden_core::{RoleId, UserId};
use warden_rbac::{
    Authorizer, Decision, InMemoryRbacStore, PermissionCode, PermissionKey, RbacAdmin, RbacConfig,
};

const RESOURCES: [&str; 3] = ["perm", "role", "authZ"];
const ACTIONS: [&str; 4] = ["read", "create", "delete", "patch"];

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

fn key(index: usize) -> PermissionKey {
    PermissionKey::new(RESOURCES[index / ACTIONS.len()], ACTIONS[index % ACTIONS.len()])
}

const UNIVERSE: usize = RESOURCES.len() * ACTIONS.len();

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    /// Authorized iff the code is in the union over the user's roles.
    #[test]
    fn authorized_iff_code_in_role_union(
        grants in prop::collection::vec(prop::collection::btree_set(0..UNIVERSE, 0..6), 0..4),
        assigned in prop::collection::vec(any::<bool>(), 4),
        wanted in 0..UNIVERSE,
    ) {
        let rt = runtime();
        let (decision, expected) = rt.block_on(async {
            let store = InMemoryRbacStore::arc();
            let admin = RbacAdmin::new(store.clone(), store.clone(), RbacConfig::default());
            let authz = Authorizer::new(store, RbacConfig::default());

            let keys: Vec<_> = (0..UNIVERSE).map(key).collect();
            let perms = admin.create_permissions(&keys).await.unwrap();

            let user = UserId::new();
            let mut union = BTreeSet::new();
            for (i, grant) in grants.iter().enumerate() {
                let role: RoleId = admin.create_role(&format!("role-{i}"), None).await.unwrap();
                let ids: Vec<_> = grant.iter().map(|g| perms[*g].id).collect();
                if !ids.is_empty() {
                    admin.add_permissions_to_role(role, &ids).await.unwrap();
                }
                if assigned[i] {
                    admin.add_roles_to_user(user, &[role]).await.unwrap();
                    union.extend(grant.iter().copied());
                }
            }

            let decision = authz.permits(user, &key(wanted).code()).await;
            (decision, union.contains(&wanted))
        });

        prop_assert_eq!(decision == Decision::Authorized, expected);
    }

    /// A user with no roles is never authorized, whatever the code.
    #[test]
    fn no_roles_never_authorized(resource in "[a-z]{1,8}", action in "[a-z-]{1,12}") {
        let rt = runtime();
        let decision = rt.block_on(async {
            let authz = Authorizer::new(InMemoryRbacStore::arc(), RbacConfig::default());
            authz
                .permits(UserId::new(), &PermissionCode::encode(&resource, &action))
                .await
        });
        prop_assert_eq!(decision, Decision::Unauthorized);
    }

    /// After adding a permission set, the role holds exactly that set.
    #[test]
    fn role_holds_exactly_what_was_added(grant in prop::collection::btree_set(0..UNIVERSE, 1..6)) {
        let rt = runtime();
        let (held, wanted) = rt.block_on(async {
            let store: Arc<InMemoryRbacStore> = InMemoryRbacStore::arc();
            let admin = RbacAdmin::new(store.clone(), store, RbacConfig::default());
            let keys: Vec<_> = (0..UNIVERSE).map(key).collect();
            let perms = admin.create_permissions(&keys).await.unwrap();
            let role = admin.create_role("r", None).await.unwrap();

            let ids: Vec<_> = grant.iter().map(|g| perms[*g].id).collect();
            admin.add_permissions_to_role(role, &ids).await.unwrap();

            let held: BTreeSet<_> = admin
                .permissions_for_roles(&[role])
                .await
                .unwrap()
                .into_iter()
                .map(|p| p.id)
                .collect();
            (held, ids.into_iter().collect::<BTreeSet<_>>())
        });
        prop_assert_eq!(held, wanted);
    }
}
