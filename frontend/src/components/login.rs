use brava_shared::Credentials;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::use_app;

#[component]
pub fn LoginPage() -> impl IntoView {
    let app = use_app();

    let (email, set_email) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        if email.get().is_empty() || password.get().is_empty() {
            set_error_msg.set(Some("Preencha todos os campos".to_string()));
            return;
        }

        set_is_submitting.set(true);
        set_error_msg.set(None);

        let credentials = Credentials {
            email: email.get(),
            password: password.get(),
        };
        let session = app.get().services().session.clone();
        spawn_local(async move {
            // 成功时控制器负责切换布局并跳转
            if let Err(failure) = session.login(&credentials).await {
                set_error_msg.set(Some(failure.message));
                set_is_submitting.set(false);
            }
        });
    };

    view! {
        <div class="text-center mb-4">
            <h1 class="text-3xl font-bold">"Brava Admin"</h1>
            <p class="text-base-content/70">"Entre com sua conta para continuar"</p>
        </div>

        <div class="card shrink-0 w-full shadow-2xl bg-base-100">
            <form class="card-body" on:submit=on_submit>
                <Show when=move || error_msg.get().is_some()>
                    <div role="alert" class="alert alert-error text-sm py-2">
                        <span>{move || error_msg.get().unwrap_or_default()}</span>
                    </div>
                </Show>

                <div class="form-control">
                    <label class="label" for="email">
                        <span class="label-text">"E-mail"</span>
                    </label>
                    <input
                        id="email"
                        type="email"
                        placeholder="voce@brava.com"
                        on:input=move |ev| set_email.set(event_target_value(&ev))
                        prop:value=email
                        class="input input-bordered"
                        required
                    />
                </div>
                <div class="form-control">
                    <label class="label" for="password">
                        <span class="label-text">"Senha"</span>
                    </label>
                    <input
                        id="password"
                        type="password"
                        placeholder="••••••••"
                        on:input=move |ev| set_password.set(event_target_value(&ev))
                        prop:value=password
                        class="input input-bordered"
                        required
                    />
                </div>
                <div class="form-control mt-6">
                    <button class="btn btn-primary" disabled=move || is_submitting.get()>
                        {move || if is_submitting.get() {
                            view! { <span class="loading loading-spinner"></span> "Entrando..." }.into_any()
                        } else {
                            "Entrar".into_any()
                        }}
                    </button>
                </div>
                <a href="#/register" class="link link-hover text-sm text-center">"Criar conta"</a>
            </form>
        </div>
    }
}

#[component]
pub fn RegisterNotice() -> impl IntoView {
    view! {
        <div class="card w-full shadow-2xl bg-base-100">
            <div class="card-body text-center">
                <h2 class="card-title justify-center">"Criar conta"</h2>
                <p class="text-base-content/70">
                    "Novas contas são criadas por um administrador."
                </p>
                <a href="#/login" class="btn btn-link">"Voltar ao login"</a>
            </div>
        </div>
    }
}
