#![cfg(test)]
extern crate std;

use super::*;
use soroban_sdk::{
    testutils::{Address as _, AuthorizedFunction, AuthorizedInvocation, Events},
    Address, Env, IntoVal, Symbol, TryFromVal, Val,
};

fn setup_test_env() -> (Env, AccessRegistryClient<'static>, Address, Address) {
    let env = Env::default();
    env.mock_all_auths();

    let contract_id = env.register(AccessRegistry, ());
    let client = AccessRegistryClient::new(&env, &contract_id);

    let admin = Address::generate(&env);
    let guardian = Address::generate(&env);

    client.initialize(&admin, &guardian);

    (env, client, admin, guardian)
}

/// Data of the most recent event published by `contract` under `topic`.
fn last_event(env: &Env, contract: &Address, topic: Symbol) -> Option<Val> {
    let mut found = None;
    for (emitter, topics, data) in env.events().all().iter() {
        if emitter != *contract {
            continue;
        }
        let first = topics.get(0).and_then(|v| Symbol::try_from_val(env, &v).ok());
        if first == Some(topic.clone()) {
            found = Some(data);
        }
    }
    found
}

#[test]
fn test_initialize() {
    let (env, client, admin, guardian) = setup_test_env();

    assert!(client.is_admin(&admin));
    assert!(!client.is_admin(&guardian));
    assert!(!client.is_admin(&Address::generate(&env)));
    assert_eq!(client.admin_count(), 1);
    assert_eq!(client.multisig_guardian(), guardian);
}

#[test]
fn test_initialize_emits_role_granted_and_guardian_updated() {
    let env = Env::default();
    env.mock_all_auths();

    let contract_id = env.register(AccessRegistry, ());
    let client = AccessRegistryClient::new(&env, &contract_id);
    let admin = Address::generate(&env);
    let guardian = Address::generate(&env);

    client.initialize(&admin, &guardian);

    let granted = last_event(&env, &contract_id, ROLE_GRANTED).unwrap();
    assert_eq!(
        RoleGranted::try_from_val(&env, &granted).unwrap(),
        RoleGranted {
            role: Role::Admin,
            account: admin.clone(),
            sender: admin.clone(),
        }
    );

    let rotated = last_event(&env, &contract_id, GUARDIAN_UPDATED).unwrap();
    assert_eq!(
        GuardianUpdated::try_from_val(&env, &rotated).unwrap(),
        GuardianUpdated {
            previous: None,
            new_guardian: guardian,
        }
    );
}

#[test]
fn test_initialize_admin_may_double_as_guardian() {
    let env = Env::default();
    env.mock_all_auths();

    let client = AccessRegistryClient::new(&env, &env.register(AccessRegistry, ()));
    let deployer = Address::generate(&env);

    client.initialize(&deployer, &deployer);

    assert!(client.is_admin(&deployer));
    assert_eq!(client.multisig_guardian(), deployer);
}

#[test]
fn test_initialize_already_initialized() {
    let (env, client, _, guardian) = setup_test_env();
    let other = Address::generate(&env);

    assert_eq!(
        client.try_initialize(&other, &guardian),
        Err(Ok(Error::AlreadyInitialized))
    );
    assert!(!client.is_admin(&other));
    assert_eq!(client.admin_count(), 1);
}

#[test]
fn test_commands_before_initialize() {
    let env = Env::default();
    env.mock_all_auths();

    let client = AccessRegistryClient::new(&env, &env.register(AccessRegistry, ()));
    let someone = Address::generate(&env);

    assert_eq!(client.try_multisig_guardian(), Err(Ok(Error::NotInitialized)));
    assert_eq!(
        client.try_grant_role(&someone, &Role::Admin, &someone),
        Err(Ok(Error::NotInitialized))
    );
    assert!(!client.is_admin(&someone));
}

#[test]
fn test_grant_role() {
    let (env, client, admin, _) = setup_test_env();
    let second = Address::generate(&env);

    client.grant_role(&admin, &Role::Admin, &second);

    let data = last_event(&env, &client.address, ROLE_GRANTED).unwrap();
    assert_eq!(
        RoleGranted::try_from_val(&env, &data).unwrap(),
        RoleGranted {
            role: Role::Admin,
            account: second.clone(),
            sender: admin,
        }
    );

    assert!(client.is_admin(&second));
    assert_eq!(client.admin_count(), 2);
}

#[test]
fn test_grant_role_is_idempotent() {
    let (env, client, admin, _) = setup_test_env();
    let second = Address::generate(&env);

    client.grant_role(&admin, &Role::Admin, &second);
    client.grant_role(&admin, &Role::Admin, &second);

    assert!(client.is_admin(&second));
    assert_eq!(client.admin_count(), 2);
}

#[test]
fn test_grant_keeper_role() {
    let (env, client, admin, _) = setup_test_env();
    let keeper = Address::generate(&env);

    client.grant_role(&admin, &Role::Keeper, &keeper);

    assert!(client.has_role(&keeper, &Role::Keeper));
    assert!(!client.is_admin(&keeper));
    assert_eq!(client.admin_count(), 1);
}

#[test]
fn test_grant_role_unauthorized() {
    let (env, client, _, guardian) = setup_test_env();
    let outsider = Address::generate(&env);
    let target = Address::generate(&env);

    assert_eq!(
        client.try_grant_role(&outsider, &Role::Admin, &target),
        Err(Ok(Error::Unauthorized))
    );
    // The guardian is not an admin either
    assert_eq!(
        client.try_grant_role(&guardian, &Role::Keeper, &target),
        Err(Ok(Error::Unauthorized))
    );
    assert!(!client.is_admin(&target));
    assert!(!client.has_role(&target, &Role::Keeper));
}

#[test]
fn test_revoke_role() {
    let (env, client, admin, _) = setup_test_env();
    let second = Address::generate(&env);
    client.grant_role(&admin, &Role::Admin, &second);

    client.revoke_role(&second, &Role::Admin, &admin);

    let data = last_event(&env, &client.address, ROLE_REVOKED).unwrap();
    assert_eq!(
        RoleRevoked::try_from_val(&env, &data).unwrap(),
        RoleRevoked {
            role: Role::Admin,
            account: admin.clone(),
            sender: second.clone(),
        }
    );

    assert!(!client.is_admin(&admin));
    assert!(client.is_admin(&second));
    assert_eq!(client.admin_count(), 1);
}

#[test]
fn test_revoke_last_admin_fails() {
    let (_, client, admin, _) = setup_test_env();

    assert_eq!(
        client.try_revoke_role(&admin, &Role::Admin, &admin),
        Err(Ok(Error::InvariantViolation))
    );
    assert!(client.is_admin(&admin));
    assert_eq!(client.admin_count(), 1);
}

#[test]
fn test_admin_set_never_empties() {
    let (env, client, admin, _) = setup_test_env();
    let second = Address::generate(&env);
    let third = Address::generate(&env);
    client.grant_role(&admin, &Role::Admin, &second);
    client.grant_role(&admin, &Role::Admin, &third);

    client.revoke_role(&admin, &Role::Admin, &second);
    client.revoke_role(&admin, &Role::Admin, &third);
    assert_eq!(
        client.try_revoke_role(&admin, &Role::Admin, &admin),
        Err(Ok(Error::InvariantViolation))
    );
    assert_eq!(client.admin_count(), 1);
}

#[test]
fn test_revoke_role_not_held_is_noop() {
    let (env, client, admin, _) = setup_test_env();
    let stranger = Address::generate(&env);

    client.revoke_role(&admin, &Role::Keeper, &stranger);

    assert!(!client.has_role(&stranger, &Role::Keeper));
    assert_eq!(client.admin_count(), 1);
}

#[test]
fn test_revoke_role_unauthorized() {
    let (env, client, admin, _) = setup_test_env();
    let outsider = Address::generate(&env);

    assert_eq!(
        client.try_revoke_role(&outsider, &Role::Admin, &admin),
        Err(Ok(Error::Unauthorized))
    );
    assert!(client.is_admin(&admin));
}

#[test]
fn test_renounce_role() {
    let (env, client, admin, _) = setup_test_env();
    let keeper = Address::generate(&env);
    client.grant_role(&admin, &Role::Keeper, &keeper);

    client.renounce_role(&keeper, &Role::Keeper);
    assert!(!client.has_role(&keeper, &Role::Keeper));

    assert_eq!(
        client.try_renounce_role(&admin, &Role::Admin),
        Err(Ok(Error::InvariantViolation))
    );
}

#[test]
fn test_update_multisig_guardian_requires_guardian_auth() {
    let (env, client, _, guardian) = setup_test_env();
    let new_guardian = Address::generate(&env);

    client.update_multisig_guardian(&new_guardian);

    assert_eq!(
        env.auths(),
        std::vec![(
            guardian.clone(),
            AuthorizedInvocation {
                function: AuthorizedFunction::Contract((
                    client.address.clone(),
                    Symbol::new(&env, "update_multisig_guardian"),
                    (new_guardian.clone(),).into_val(&env),
                )),
                sub_invocations: std::vec![],
            }
        )]
    );

    let data = last_event(&env, &client.address, GUARDIAN_UPDATED).unwrap();
    assert_eq!(
        GuardianUpdated::try_from_val(&env, &data).unwrap(),
        GuardianUpdated {
            previous: Some(guardian),
            new_guardian: new_guardian.clone(),
        }
    );

    assert_eq!(client.multisig_guardian(), new_guardian);
}

#[test]
fn test_guardian_grant_admin() {
    let (env, client, _, guardian) = setup_test_env();
    let recovered = Address::generate(&env);

    client.guardian_grant_admin(&recovered);

    assert_eq!(env.auths()[0].0, guardian);
    assert!(client.is_admin(&recovered));
    assert_eq!(client.admin_count(), 2);
}
